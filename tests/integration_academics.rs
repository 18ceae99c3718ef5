mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use common::{
    TestApp, TestClass, create_admin, create_student, create_teacher, create_test_class,
    send_file, send_json, send_multipart, setup_test_app,
};

async fn create_assignment(
    app: &TestApp,
    class: &TestClass,
    teacher_id: Uuid,
    due_in: Duration,
) -> Uuid {
    sqlx::query_scalar(
        r#"INSERT INTO assignments
               (title, subject_id, class_id, uploaded_by, file_data, file_name,
                file_mime_type, file_size, due_date)
           VALUES ('Fractions worksheet', $1, $2, $3, $4, 'worksheet.pdf',
                   'application/pdf', 4, $5)
           RETURNING id"#,
    )
    .bind(class.subject_ids[0])
    .bind(class.id)
    .bind(teacher_id)
    .bind(b"%PDF".as_slice())
    .bind(Utc::now() + due_in)
    .fetch_one(&app.state.db)
    .await
    .unwrap()
}

async fn attendance_status(pool: &PgPool, student_id: Uuid, subject_id: Uuid) -> Option<String> {
    sqlx::query_scalar(
        r#"SELECT status::TEXT FROM attendance
           WHERE student_id = $1 AND subject_id = $2
           ORDER BY date DESC LIMIT 1"#,
    )
    .bind(student_id)
    .bind(subject_id)
    .fetch_optional(pool)
    .await
    .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_attendance_batch_is_idempotent(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let admin = create_admin(&app).await;
    let class = create_test_class(&pool, "6", &["Maths", "Science"]).await;
    create_student(&app, class.id, "NO001").await;
    create_student(&app, class.id, "NO002").await;

    let (status, first) =
        send_json(&app, "POST", "/api/admin/attendance/run", Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["studentsProcessed"], 2);
    assert_eq!(first["recordsCreated"], 4);

    let (status, second) =
        send_json(&app, "POST", "/api/admin/attendance/run", Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["recordsAttempted"], 4);
    assert_eq!(second["recordsCreated"], 0);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 4);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_on_time_submission_marks_present(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let admin = create_admin(&app).await;
    let class = create_test_class(&pool, "6", &["Maths"]).await;
    let teacher = create_teacher(&app, &["Maths"]).await;
    let student = create_student(&app, class.id, "NO001").await;
    let assignment = create_assignment(&app, &class, teacher.id, Duration::days(2)).await;

    send_json(&app, "POST", "/api/admin/attendance/run", Some(&admin.token), None).await;
    assert_eq!(
        attendance_status(&pool, student.id, class.subject_ids[0]).await.as_deref(),
        Some("absent")
    );

    let (status, pending) =
        send_json(&app, "GET", "/api/student/assignments/pending", Some(&student.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, body) = send_file(
        &app,
        &format!("/api/student/assignments/{assignment}/submit"),
        &student.token,
        "file",
        "answers.txt",
        "text/plain",
        b"1/2 + 1/4 = 3/4",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["attendanceUpdated"], true);
    assert_eq!(body["submission"]["status"], "submitted");
    assert_eq!(
        attendance_status(&pool, student.id, class.subject_ids[0]).await.as_deref(),
        Some("present")
    );

    let (status, pending) =
        send_json(&app, "GET", "/api/student/assignments/pending", Some(&student.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(pending.as_array().unwrap().is_empty());

    // One submission per student and assignment.
    let (status, _) = send_file(
        &app,
        &format!("/api/student/assignments/{assignment}/submit"),
        &student.token,
        "file",
        "answers.txt",
        "text/plain",
        b"again",
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_late_submission_leaves_attendance(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let admin = create_admin(&app).await;
    let class = create_test_class(&pool, "6", &["Maths"]).await;
    let teacher = create_teacher(&app, &["Maths"]).await;
    let student = create_student(&app, class.id, "NO001").await;
    let assignment = create_assignment(&app, &class, teacher.id, Duration::hours(-1)).await;

    send_json(&app, "POST", "/api/admin/attendance/run", Some(&admin.token), None).await;

    let (status, body) = send_file(
        &app,
        &format!("/api/student/assignments/{assignment}/submit"),
        &student.token,
        "file",
        "answers.txt",
        "text/plain",
        b"late work",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["attendanceUpdated"], false);
    assert_eq!(body["submission"]["status"], "late");
    assert_eq!(
        attendance_status(&pool, student.id, class.subject_ids[0]).await.as_deref(),
        Some("absent")
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_submission_for_other_class_forbidden(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let class = create_test_class(&pool, "6", &["Maths"]).await;
    let other = create_test_class(&pool, "8", &["Maths"]).await;
    let teacher = create_teacher(&app, &["Maths"]).await;
    let student = create_student(&app, other.id, "NO001").await;
    let assignment = create_assignment(&app, &class, teacher.id, Duration::days(1)).await;

    let (status, _) = send_file(
        &app,
        &format!("/api/student/assignments/{assignment}/submit"),
        &student.token,
        "file",
        "answers.txt",
        "text/plain",
        b"wrong class",
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_scheduled_subject_moderation(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let admin = create_admin(&app).await;
    let teacher = create_teacher(&app, &["Maths"]).await;
    let class = create_test_class(&pool, "6", &["Maths"]).await;

    let (status, request) = send_json(
        &app,
        "POST",
        "/api/teacher/scheduled-subjects",
        Some(&teacher.token),
        Some(json!({ "classId": class.id, "subjectId": class.subject_ids[0] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "pending");
    let id = request["id"].as_str().unwrap().to_string();

    let (status, pending) = send_json(
        &app,
        "GET",
        "/api/admin/review/scheduled-subjects/pending",
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/admin/review/scheduled-subjects/{id}/reject"),
        Some(&admin.token),
        Some(json!({ "reason": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, outcome) = send_json(
        &app,
        "POST",
        &format!("/api/admin/review/scheduled-subjects/{id}/approve"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["status"], "approved");

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/admin/review/scheduled-subjects/{id}/approve"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/admin/review/unknown/{id}/approve"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_note_moderation(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let admin = create_admin(&app).await;
    let teacher = create_teacher(&app, &["Maths"]).await;
    let class = create_test_class(&pool, "6", &["Maths"]).await;
    let student = create_student(&app, class.id, "NO001").await;

    let (status, note) = send_multipart(
        &app,
        "/api/teacher/notes",
        Some(&teacher.token),
        &[
            ("title", "Fractions"),
            ("subjectName", "Maths"),
            ("className", class.class_name.as_str()),
        ],
        Some(("file", "fractions.pdf", "application/pdf", b"%PDF-1.4 fractions".as_slice())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["status"], "pending");
    let id = note["id"].as_str().unwrap().to_string();
    let download = format!("/api/notes/{id}/download");

    let (status, _) = send_json(&app, "GET", &download, Some(&student.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, pending) =
        send_json(&app, "GET", "/api/admin/review/notes/pending", Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending[0]["title"], "Fractions");

    let (status, outcome) = send_json(
        &app,
        "POST",
        &format!("/api/admin/review/notes/{id}/approve"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["entity"], "notes");
    assert_eq!(outcome["status"], "approved");
    assert_eq!(app.notifier.sent_to(&teacher.email).len(), 1);

    let (status, _) = send_json(&app, "GET", &download, Some(&student.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/admin/review/notes/{id}/reject"),
        Some(&admin.token),
        Some(json!({ "reason": "Too late" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_event_announcement_moderation(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let admin = create_admin(&app).await;
    let teacher = create_teacher(&app, &["Maths"]).await;
    let class = create_test_class(&pool, "6", &["Maths"]).await;

    let (status, event) = send_json(
        &app,
        "POST",
        "/api/teacher/announcements",
        Some(&teacher.token),
        Some(json!({
            "title": "Science fair",
            "description": "Projects on display in the hall",
            "type": "event",
            "eventDate": (Utc::now() + Duration::days(7)).to_rfc3339(),
            "eventLocation": "Main hall"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["status"], "pending");
    let id = event["id"].as_str().unwrap().to_string();

    // Class announcements skip review.
    let (status, notice) = send_json(
        &app,
        "POST",
        "/api/teacher/announcements",
        Some(&teacher.token),
        Some(json!({
            "title": "Homework",
            "description": "Exercise 4.2",
            "type": "student",
            "classId": class.id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(notice["status"], "approved");

    let (status, pending) = send_json(
        &app,
        "GET",
        "/api/admin/review/announcements/pending",
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], id);

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/admin/review/announcements/{id}/reject"),
        Some(&admin.token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, outcome) = send_json(
        &app,
        "POST",
        &format!("/api/admin/review/announcements/{id}/reject"),
        Some(&admin.token),
        Some(json!({ "reason": "Hall is booked that week" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["status"], "rejected");
    assert_eq!(outcome["rejectionReason"], "Hall is booked that week");

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/admin/review/announcements/{id}/approve"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_role_layers_reject_other_roles(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let class = create_test_class(&pool, "6", &["Maths"]).await;
    let student = create_student(&app, class.id, "NO001").await;
    let teacher = create_teacher(&app, &["Maths"]).await;

    let (status, _) = send_json(
        &app,
        "GET",
        "/api/admin/students/pending",
        Some(&student.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
        send_json(&app, "GET", "/api/teacher/profile", Some(&student.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
        send_json(&app, "GET", "/api/student/profile", Some(&teacher.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_json(&app, "GET", "/api/student/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
