mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

use common::{
    TEST_PASSWORD, create_parent, create_student, create_test_class, generate_unique_email,
    send_json, setup_test_app,
};

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_register_and_login(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let class = create_test_class(&pool, "4", &["English"]).await;
    create_student(&app, class.id, "NO001").await;
    let email = generate_unique_email();

    let (status, registered) = send_json(
        &app,
        "POST",
        "/api/auth/parent/register",
        None,
        Some(json!({
            "fullName": "Meera Verma",
            "email": email,
            "phone": "+919811112222",
            "linkedStudents": [{ "studentId": "no001", "relationship": "Mother" }],
            "password": "parent123",
            "confirmPassword": "parent123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(registered["linkedStudents"][0]["studentId"], "NO001");

    let (status, login) = send_json(
        &app,
        "POST",
        "/api/auth/parent/login",
        None,
        Some(json!({ "studentId": "NO001", "password": "parent123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"]["email"], email);
    assert_eq!(login["linkedStudents"].as_array().unwrap().len(), 1);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/parent/login",
        None,
        Some(json!({ "studentId": "NO001", "password": "wrong-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_register_unknown_student(pool: PgPool) {
    let app = setup_test_app(pool);

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/auth/parent/register",
        None,
        Some(json!({
            "fullName": "Meera Verma",
            "email": generate_unique_email(),
            "phone": "+919811112222",
            "linkedStudents": [{ "studentId": "NO404", "relationship": "Mother" }],
            "password": "parent123",
            "confirmPassword": "parent123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Student with ID NO404 not found");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_sees_only_linked_children(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let class = create_test_class(&pool, "4", &["English"]).await;
    let child = create_student(&app, class.id, "NO001").await;
    create_student(&app, class.id, "NO002").await;
    let parent = create_parent(&app, &["NO001"]).await;

    let (status, profile) = send_json(
        &app,
        "GET",
        "/api/parent/child/NO001/profile",
        Some(&parent.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], child.email);

    let (status, body) = send_json(
        &app,
        "GET",
        "/api/parent/child/NO002/profile",
        Some(&parent.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You are not linked to this student");

    let (status, children) =
        send_json(&app, "GET", "/api/parent/children", Some(&parent.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(children.as_array().unwrap().len(), 1);

    // Students cannot use the parent views.
    let (status, _) = send_json(
        &app,
        "GET",
        "/api/parent/child/NO001/profile",
        Some(&child.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_login_picks_matching_parent(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let class = create_test_class(&pool, "4", &["English"]).await;
    create_student(&app, class.id, "NO001").await;
    let first = create_parent(&app, &["NO001"]).await;
    let second = create_parent(&app, &["NO001"]).await;
    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(second.id)
        .bind(schoolhub_core::hash_password("second-pass").unwrap())
        .execute(&pool)
        .await
        .unwrap();

    let (status, login) = send_json(
        &app,
        "POST",
        "/api/auth/parent/login",
        None,
        Some(json!({ "studentId": "NO001", "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"]["email"], first.email);

    let (status, login) = send_json(
        &app,
        "POST",
        "/api/auth/parent/login",
        None,
        Some(json!({ "studentId": "NO001", "password": "second-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"]["email"], second.email);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_reads_child_marks_by_subject(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let class = create_test_class(&pool, "4", &["English"]).await;
    create_student(&app, class.id, "NO001").await;
    let parent = create_parent(&app, &["NO001"]).await;

    let (status, marks) = send_json(
        &app,
        "GET",
        "/api/parent/child/NO001/marks/English",
        Some(&parent.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(marks.as_array().unwrap().is_empty());

    let (status, _) = send_json(
        &app,
        "GET",
        "/api/parent/child/NO001/marks/Latin",
        Some(&parent.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
