//! Subjects and HTML bodies of the emails the API sends.
//!
//! Every template returns an [`EmailContent`]; values interpolated into the
//! markup are HTML-escaped.

use crate::modules::auth::otp::OtpPurpose;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
}

impl EmailContent {
    fn new(subject: impl Into<String>, title: &str, body: &str) -> Self {
        Self {
            subject: subject.into(),
            html: layout(title, body),
        }
    }
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
</head>
<body style="margin: 0; padding: 0; font-family: Arial, sans-serif; background-color: #f4f4f4;">
    <table width="100%" cellpadding="0" cellspacing="0" style="background-color: #f4f4f4; padding: 20px;">
        <tr>
            <td align="center">
                <table width="600" cellpadding="0" cellspacing="0" style="background-color: #ffffff; border-radius: 8px; overflow: hidden;">
                    <tr>
                        <td style="background-color: #1D4ED8; padding: 30px; text-align: center;">
                            <h1 style="margin: 0; color: #ffffff; font-size: 28px;">SchoolHub</h1>
                        </td>
                    </tr>
                    <tr>
                        <td style="padding: 40px 30px; color: #444444; font-size: 16px; line-height: 1.5;">
                            <h2 style="margin: 0 0 20px 0; color: #333333; font-size: 22px;">{title}</h2>
                            {body}
                        </td>
                    </tr>
                    <tr>
                        <td style="background-color: #f8f9fa; padding: 20px 30px; text-align: center; border-top: 1px solid #e9ecef;">
                            <p style="margin: 0; color: #999999; font-size: 12px;">
                                This is an automated email from SchoolHub. Please do not reply.
                            </p>
                        </td>
                    </tr>
                </table>
            </td>
        </tr>
    </table>
</body>
</html>"#
    )
}

fn greeting(name: &str) -> String {
    format!("<p>Hi <strong>{}</strong>,</p>", escape(name))
}

pub fn otp(code: &str, ttl_minutes: i64, purpose: OtpPurpose) -> EmailContent {
    let intro = match purpose {
        OtpPurpose::Verification => "Use the code below to verify your email address.",
        OtpPurpose::PasswordReset => "Use the code below to reset your password.",
    };
    let body = format!(
        r#"<p>{intro}</p>
<p style="font-size: 32px; font-weight: bold; letter-spacing: 6px; text-align: center; color: #1D4ED8;">{code}</p>
<p>This code expires in <strong>{ttl_minutes} minutes</strong>.</p>
<p>If you did not request this code, you can ignore this email.</p>"#,
        code = escape(code),
    );
    EmailContent::new(purpose.subject(), purpose.subject(), &body)
}

pub fn teacher_signup_received(name: &str) -> EmailContent {
    let body = format!(
        "{}<p>Thank you for registering as a teacher. Your application is under review and you will \
         receive an email once an administrator has made a decision.</p>",
        greeting(name)
    );
    EmailContent::new("Teacher registration received", "Registration received", &body)
}

pub fn teacher_approved(name: &str, frontend_url: &str) -> EmailContent {
    let body = format!(
        r#"{}<p>Your teacher account has been approved. You can now sign in with your email and password.</p>
<p><a href="{}/login" style="color: #1D4ED8;">Sign in to SchoolHub</a></p>"#,
        greeting(name),
        escape(frontend_url)
    );
    EmailContent::new("Your teacher account is approved", "Account approved", &body)
}

pub fn teacher_rejected(name: &str, reason: &str) -> EmailContent {
    let body = format!(
        "{}<p>We are unable to approve your teacher account at this time.</p><p><strong>Reason:</strong> {}</p>",
        greeting(name),
        escape(reason)
    );
    EmailContent::new("Your teacher application", "Application not approved", &body)
}

pub fn student_approved(name: &str, role_number: &str, frontend_url: &str) -> EmailContent {
    let body = format!(
        r#"{}<p>Your admission has been approved.</p>
<p>Your role number is <strong>{role}</strong>. Sign in with your role number or email; your initial
password is your role number. Please change it after your first login.</p>
<p><a href="{url}/login" style="color: #1D4ED8;">Sign in to SchoolHub</a></p>"#,
        greeting(name),
        role = escape(role_number),
        url = escape(frontend_url),
    );
    EmailContent::new("Your admission is approved", "Admission approved", &body)
}

pub fn student_rejected(name: &str, reason: &str) -> EmailContent {
    let body = format!(
        "{}<p>We are unable to approve the admission request at this time.</p><p><strong>Reason:</strong> {}</p>",
        greeting(name),
        escape(reason)
    );
    EmailContent::new("Admission request update", "Admission not approved", &body)
}

/// Credentials for a parent account provisioned on a student's approval.
/// The generated password is sent in cleartext.
pub fn parent_credentials(
    parent_name: &str,
    student_name: &str,
    role_number: &str,
    password: &str,
    frontend_url: &str,
) -> EmailContent {
    let body = format!(
        r#"{}<p>The admission of <strong>{student}</strong> has been approved and a parent account is ready for you.</p>
<table cellpadding="6" style="border-collapse: collapse;">
    <tr><td>Student ID</td><td><strong>{role}</strong></td></tr>
    <tr><td>Password</td><td><strong>{password}</strong></td></tr>
</table>
<p>Sign in with the student ID and this password.</p>
<p><a href="{url}/parent/login" style="color: #1D4ED8;">Sign in to SchoolHub</a></p>"#,
        greeting(parent_name),
        student = escape(student_name),
        role = escape(role_number),
        password = escape(password),
        url = escape(frontend_url),
    );
    EmailContent::new("Your parent account", "Parent account created", &body)
}

pub fn note_decision(teacher_name: &str, title: &str, reason: Option<&str>) -> EmailContent {
    match reason {
        None => {
            let body = format!(
                "{}<p>Your note <strong>{}</strong> has been approved and is now visible to students.</p>",
                greeting(teacher_name),
                escape(title)
            );
            EmailContent::new("Note approved", "Note approved", &body)
        }
        Some(reason) => {
            let body = format!(
                "{}<p>Your note <strong>{}</strong> was not approved.</p><p><strong>Reason:</strong> {}</p>",
                greeting(teacher_name),
                escape(title),
                escape(reason)
            );
            EmailContent::new("Note rejected", "Note rejected", &body)
        }
    }
}

pub fn password_changed(name: &str) -> EmailContent {
    let body = format!(
        "{}<p>Your password has been reset. If you did not make this change, contact the school office.</p>",
        greeting(name)
    );
    EmailContent::new("Password reset successful", "Password changed", &body)
}

/// Plain-text alternative of an HTML body.
pub fn html_to_text(html: &str) -> String {
    let body = html.find("<body").map(|i| &html[i..]).unwrap_or(html);
    let mut text = String::with_capacity(body.len());
    let mut in_tag = false;
    for c in body.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }

    #[test]
    fn test_otp_template_mentions_code_and_ttl() {
        let email = otp("482913", 15, OtpPurpose::PasswordReset);
        assert!(email.html.contains("482913"));
        assert!(email.html.contains("15 minutes"));
        assert_eq!(email.subject, OtpPurpose::PasswordReset.subject());
    }

    #[test]
    fn test_names_are_escaped() {
        let email = teacher_rejected("<script>", "Missing <id>");
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("Missing &lt;id&gt;"));
    }

    #[test]
    fn test_parent_credentials_carry_password() {
        let email = parent_credentials("Ravi", "Asha", "NO001", "aB3dE5fG", "http://app");
        assert!(email.html.contains("aB3dE5fG"));
        assert!(email.html.contains("NO001"));
    }

    #[test]
    fn test_html_to_text() {
        let text = html_to_text(&student_approved("Asha", "NO001", "http://app").html);
        assert!(text.contains("Hi Asha ,"));
        assert!(text.contains("NO001"));
        assert!(!text.contains('<'));
    }
}
