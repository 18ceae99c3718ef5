mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use common::{
    TEST_PASSWORD, TestApp, create_admin, generate_unique_email, send_json, send_multipart,
    setup_test_app,
};
use schoolhub::modules::approvals::role_number;

/// Submits an admission request for class `class_name` of region North,
/// naming `parent_email` as the mother's contact. Returns the student id.
async fn request_admission(app: &TestApp, email: &str, class_name: &str, parent_email: &str) -> Uuid {
    let parent_details = json!({
        "name": "Lakshmi Iyer",
        "relationship": "Mother",
        "email": parent_email,
        "phone": "+919800011122"
    })
    .to_string();

    let (status, _) = send_multipart(
        app,
        "/api/auth/student/request",
        None,
        &[
            ("fullName", "Meera Iyer"),
            ("email", email),
            ("phone", "+919876543210"),
            ("academicRegion", "North"),
            ("class", class_name),
            ("parentDetails", parent_details.as_str()),
        ],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_one(&app.state.db)
        .await
        .unwrap()
}

async fn create_class(pool: &PgPool, class_name: &str) {
    sqlx::query("INSERT INTO classes (class_name, class_code) VALUES ($1, $2)")
        .bind(class_name)
        .bind(format!("CL-{class_name}"))
        .execute(pool)
        .await
        .unwrap();
}

/// Password from the most recent credentials email sent to `to`.
fn emailed_password(app: &TestApp, to: &str) -> String {
    let mail = app
        .notifier
        .sent_to(to)
        .into_iter()
        .rev()
        .find(|m| m.subject == "Your parent account")
        .expect("credentials email sent");
    let start = mail
        .html
        .find("<td>Password</td><td><strong>")
        .expect("password row")
        + "<td>Password</td><td><strong>".len();
    let end = start + mail.html[start..].find("</strong>").unwrap();
    mail.html[start..end].to_string()
}

async fn linked_role_numbers(pool: &PgPool, parent_email: &str) -> Vec<String> {
    sqlx::query_scalar(
        r#"SELECT ps.student_role_number
           FROM parent_students ps
           JOIN users u ON u.id = ps.parent_id
           WHERE u.email = $1
           ORDER BY ps.student_role_number"#,
    )
    .bind(parent_email)
    .fetch_all(pool)
    .await
    .unwrap()
}

async fn login_student(app: &TestApp, identifier: &str, password: &str) -> StatusCode {
    send_json(
        app,
        "POST",
        "/api/auth/student/login",
        None,
        Some(json!({ "identifier": identifier, "password": password })),
    )
    .await
    .0
}

async fn login_parent(app: &TestApp, role_number: &str, password: &str) -> StatusCode {
    send_json(
        app,
        "POST",
        "/api/auth/parent/login",
        None,
        Some(json!({ "studentId": role_number, "password": password })),
    )
    .await
    .0
}

#[sqlx::test(migrations = "./migrations")]
async fn test_approval_assigns_role_number_and_creates_parent(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    create_class(&pool, "3").await;
    let admin = create_admin(&app).await;
    let email = generate_unique_email();
    let parent_email = generate_unique_email();
    let student_id = request_admission(&app, &email, "3", &parent_email).await;

    let (status, approval) = send_json(
        &app,
        "POST",
        &format!("/api/admin/students/{student_id}/approve"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approval["student"]["roleNumber"], "NO001");
    assert_eq!(approval["parentAccountCreated"], true);
    assert_eq!(approval["parentEmail"], parent_email);

    assert_eq!(login_student(&app, "NO001", "NO001").await, StatusCode::OK);

    let relationship: String = sqlx::query_scalar(
        r#"SELECT ps.relationship FROM parent_students ps
           JOIN users u ON u.id = ps.parent_id
           WHERE u.email = $1 AND u.role = 'parent' AND ps.student_role_number = 'NO001'"#,
    )
    .bind(&parent_email)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(relationship, "Mother");

    let password = emailed_password(&app, &parent_email);
    assert_eq!(password.len(), 8);
    assert_eq!(login_parent(&app, "NO001", &password).await, StatusCode::OK);
    assert_eq!(app.notifier.sent_to(&email).len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_approval_resets_self_registered_password(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    create_class(&pool, "7").await;
    let admin = create_admin(&app).await;
    let email = generate_unique_email();

    let (status, registered) = send_json(
        &app,
        "POST",
        "/api/auth/student/register",
        None,
        Some(json!({
            "fullName": "Asha Verma",
            "dob": "2014-03-02",
            "email": email,
            "phone": "+919876543210",
            "academicRegion": "North",
            "class": "7",
            "password": "secret123",
            "confirmPassword": "secret123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(registered["roleNumber"], "NO001");

    let student_id: Uuid = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();
    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/admin/students/{student_id}/approve"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(login_student(&app, "NO001", "NO001").await, StatusCode::OK);
    assert_eq!(
        login_student(&app, "NO001", "secret123").await,
        StatusCode::UNAUTHORIZED
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_approval_reuses_existing_parent(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    create_class(&pool, "3").await;
    let admin = create_admin(&app).await;
    let parent_email = generate_unique_email();

    // Parent already on file with a link to the first number the region hands out.
    let parent_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO users (role, full_name, email, password_hash, is_email_verified)
           VALUES ('parent', 'Lakshmi Iyer', $1, $2, TRUE) RETURNING id"#,
    )
    .bind(&parent_email)
    .bind(schoolhub_core::hash_password(TEST_PASSWORD).unwrap())
    .fetch_one(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO parent_students (parent_id, student_role_number, relationship) VALUES ($1, 'NO001', 'Mother')",
    )
    .bind(parent_id)
    .execute(&pool)
    .await
    .unwrap();

    let first = request_admission(&app, &generate_unique_email(), "3", &parent_email).await;
    let second = request_admission(&app, &generate_unique_email(), "3", &parent_email).await;

    let (status, approval) = send_json(
        &app,
        "POST",
        &format!("/api/admin/students/{first}/approve"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approval["student"]["roleNumber"], "NO001");
    assert_eq!(approval["parentAccountCreated"], false);
    assert_eq!(linked_role_numbers(&pool, &parent_email).await, ["NO001"]);
    let first_password = emailed_password(&app, &parent_email);
    assert_eq!(login_parent(&app, "NO001", TEST_PASSWORD).await, StatusCode::UNAUTHORIZED);

    let (status, approval) = send_json(
        &app,
        "POST",
        &format!("/api/admin/students/{second}/approve"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approval["student"]["roleNumber"], "NO002");
    assert_eq!(approval["parentAccountCreated"], false);
    assert_eq!(
        linked_role_numbers(&pool, &parent_email).await,
        ["NO001", "NO002"]
    );

    let second_password = emailed_password(&app, &parent_email);
    assert_ne!(first_password, second_password);
    assert_eq!(
        login_parent(&app, "NO002", &first_password).await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(login_parent(&app, "NO002", &second_password).await, StatusCode::OK);
    assert_eq!(login_student(&app, "NO002", "NO002").await, StatusCode::OK);

    let parents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&parent_email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(parents, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reject_admission_notifies_parent(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    create_class(&pool, "3").await;
    let admin = create_admin(&app).await;
    let email = generate_unique_email();
    let parent_email = generate_unique_email();
    let student_id = request_admission(&app, &email, "3", &parent_email).await;
    let uri = format!("/api/admin/students/{student_id}/reject");

    let (status, _) =
        send_json(&app, "POST", &uri, Some(&admin.token), Some(json!({ "reason": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, rejected) = send_json(
        &app,
        "POST",
        &uri,
        Some(&admin.token),
        Some(json!({ "reason": "Birth certificate missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["studentStatus"], "rejected");

    let parent_mail = app.notifier.sent_to(&parent_email);
    assert_eq!(parent_mail.len(), 1);
    assert!(parent_mail[0].html.contains("Birth certificate missing"));
    assert_eq!(app.notifier.sent_to(&email).len(), 1);

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/admin/students/{student_id}/approve"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admission_for_young_class_needs_parent(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    create_class(&pool, "2").await;
    let email = generate_unique_email();

    let (status, _) = send_multipart(
        &app,
        "/api/auth/student/request",
        None,
        &[
            ("fullName", "Kabir Iyer"),
            ("email", email.as_str()),
            ("academicRegion", "North"),
            ("class", "2"),
        ],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_role_number_prefix_is_literal(pool: PgPool) {
    for (region, role_number) in [("_xy", "_X001"), ("other", "_X002"), ("Axle", "AX050")] {
        sqlx::query(
            r#"INSERT INTO users (role, full_name, email, academic_region, role_number, student_status)
               VALUES ('student', 'Seeded Student', $1, $2, $3, 'approved')"#,
        )
        .bind(generate_unique_email())
        .bind(region)
        .bind(role_number)
        .execute(&pool)
        .await
        .unwrap();
    }

    let mut conn = pool.acquire().await.unwrap();
    let next = role_number::generate(&mut *conn, "_xy").await.unwrap();
    assert_eq!(next, "_X003");
}
