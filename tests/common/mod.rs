use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use schoolhub::router::init_router;
use schoolhub::state::AppState;
use schoolhub::utils::notifier::RecordingNotifier;
use schoolhub_auth::{UserRole, create_access_token};
use schoolhub_config::{
    CorsConfig, EmailConfig, JwtConfig, OtpConfig, RateLimitConfig, SchedulerConfig, UploadConfig,
};
use schoolhub_core::{LocalFileStorage, hash_password};

pub const TEST_PASSWORD: &str = "password123";

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub notifier: Arc<RecordingNotifier>,
    _uploads: TempDir,
}

#[allow(dead_code)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role_number: Option<String>,
    pub token: String,
}

#[allow(dead_code)]
pub struct TestClass {
    pub id: Uuid,
    pub class_name: String,
    pub subject_ids: Vec<Uuid>,
}

/// App wired to `pool` with rate limiting off, uploads in a temporary
/// directory and every email captured in memory.
pub fn setup_test_app(pool: PgPool) -> TestApp {
    let uploads = TempDir::new().unwrap();
    let notifier = Arc::new(RecordingNotifier::new());
    let upload_config = UploadConfig {
        dir: uploads.path().to_string_lossy().into_owned(),
        ..UploadConfig::from_env()
    };

    let state = AppState {
        db: pool,
        jwt_config: JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry: 3600,
        },
        email_config: EmailConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        rate_limit_config: RateLimitConfig::disabled(),
        otp_config: OtpConfig::default(),
        upload_config,
        scheduler_config: SchedulerConfig::default(),
        storage: Arc::new(LocalFileStorage::new(uploads.path())),
        notifier: notifier.clone(),
    };

    TestApp {
        router: init_router(state.clone()),
        state,
        notifier,
        _uploads: uploads,
    }
}

pub fn generate_unique_email() -> String {
    format!("test-{}@example.com", Uuid::new_v4())
}

/// Class with one subject per entry in `subjects`. Class names are capped at
/// ten characters by the schema.
#[allow(dead_code)]
pub async fn create_test_class(pool: &PgPool, class_name: &str, subjects: &[&str]) -> TestClass {
    let suffix = Uuid::new_v4().simple().to_string();
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO classes (class_name, class_code) VALUES ($1, $2) RETURNING id",
    )
    .bind(class_name)
    .bind(format!("C-{}", &suffix[..8]))
    .fetch_one(pool)
    .await
    .unwrap();

    let mut subject_ids = Vec::with_capacity(subjects.len());
    for (i, name) in subjects.iter().enumerate() {
        let subject_id: Uuid = sqlx::query_scalar(
            r#"INSERT INTO subjects (subject_code, subject_name, class_id)
               VALUES ($1, $2, $3) RETURNING id"#,
        )
        .bind(format!("S-{}-{i}", &suffix[..8]))
        .bind(name)
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap();
        subject_ids.push(subject_id);
    }

    TestClass {
        id,
        class_name: class_name.to_string(),
        subject_ids,
    }
}

fn token_for(app: &TestApp, id: Uuid, email: &str, role: UserRole, role_number: Option<&str>) -> String {
    create_access_token(id, email, role, role_number, &app.state.jwt_config).unwrap()
}

/// Verified admin with [`TEST_PASSWORD`].
#[allow(dead_code)]
pub async fn create_admin(app: &TestApp) -> TestUser {
    let email = generate_unique_email();
    let id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO users (role, full_name, email, password_hash, is_email_verified)
           VALUES ('admin', 'Test Admin', $1, $2, TRUE) RETURNING id"#,
    )
    .bind(&email)
    .bind(hash_password(TEST_PASSWORD).unwrap())
    .fetch_one(&app.state.db)
    .await
    .unwrap();

    let token = token_for(app, id, &email, UserRole::Admin, None);
    TestUser {
        id,
        email,
        role_number: None,
        token,
    }
}

/// Approved teacher specialised in `subjects`.
#[allow(dead_code)]
pub async fn create_teacher(app: &TestApp, subjects: &[&str]) -> TestUser {
    let email = generate_unique_email();
    let specialization: Vec<String> = subjects.iter().map(|s| s.to_string()).collect();
    let id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO users
               (role, full_name, email, password_hash, is_email_verified,
                teacher_status, subject_specialization)
           VALUES ('teacher', 'Test Teacher', $1, $2, TRUE, 'approved', $3) RETURNING id"#,
    )
    .bind(&email)
    .bind(hash_password(TEST_PASSWORD).unwrap())
    .bind(&specialization)
    .fetch_one(&app.state.db)
    .await
    .unwrap();

    let token = token_for(app, id, &email, UserRole::Teacher, None);
    TestUser {
        id,
        email,
        role_number: None,
        token,
    }
}

/// Approved, verified student of `class_id` holding `role_number`.
#[allow(dead_code)]
pub async fn create_student(app: &TestApp, class_id: Uuid, role_number: &str) -> TestUser {
    let email = generate_unique_email();
    let id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO users
               (role, full_name, email, password_hash, is_email_verified, class_id,
                role_number, academic_region, student_status, registration_source)
           VALUES ('student', 'Test Student', $1, $2, TRUE, $3, $4, 'North', 'approved', 'admin')
           RETURNING id"#,
    )
    .bind(&email)
    .bind(hash_password(TEST_PASSWORD).unwrap())
    .bind(class_id)
    .bind(role_number)
    .fetch_one(&app.state.db)
    .await
    .unwrap();

    let token = token_for(app, id, &email, UserRole::Student, Some(role_number));
    TestUser {
        id,
        email,
        role_number: Some(role_number.to_string()),
        token,
    }
}

/// Parent linked to each role number in `children`.
#[allow(dead_code)]
pub async fn create_parent(app: &TestApp, children: &[&str]) -> TestUser {
    let email = generate_unique_email();
    let id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO users (role, full_name, email, password_hash, is_email_verified)
           VALUES ('parent', 'Test Parent', $1, $2, TRUE) RETURNING id"#,
    )
    .bind(&email)
    .bind(hash_password(TEST_PASSWORD).unwrap())
    .fetch_one(&app.state.db)
    .await
    .unwrap();

    for role_number in children {
        sqlx::query(
            r#"INSERT INTO parent_students (parent_id, student_role_number, relationship)
               VALUES ($1, $2, 'Guardian')"#,
        )
        .bind(id)
        .bind(role_number)
        .execute(&app.state.db)
        .await
        .unwrap();
    }

    let token = token_for(app, id, &email, UserRole::Parent, None);
    TestUser {
        id,
        email,
        role_number: None,
        token,
    }
}

/// Sends a request with an optional JSON body and bearer token, returning the
/// status and the parsed body (`Value::Null` when empty or not JSON).
#[allow(dead_code)]
pub async fn send_json(
    app: &TestApp,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// File part of a multipart request: field, file name, content type, bytes.
#[allow(dead_code)]
pub type FilePart<'a> = (&'a str, &'a str, &'a str, &'a [u8]);

/// Posts a multipart body of text `fields` and an optional file part.
#[allow(dead_code)]
pub async fn send_multipart(
    app: &TestApp,
    uri: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
    file: Option<FilePart<'_>>,
) -> (StatusCode, Value) {
    let boundary = "schoolhub-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((field, file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    let mut builder = Request::builder().method("POST").uri(uri).header(
        "content-type",
        format!("multipart/form-data; boundary={boundary}"),
    );
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(body)).unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Posts a single-file multipart body.
#[allow(dead_code)]
pub async fn send_file(
    app: &TestApp,
    uri: &str,
    token: &str,
    field: &str,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> (StatusCode, Value) {
    send_multipart(
        app,
        uri,
        Some(token),
        &[],
        Some((field, file_name, content_type, bytes)),
    )
    .await
}
