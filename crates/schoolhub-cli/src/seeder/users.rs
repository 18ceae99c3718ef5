//! Demo account seeding.
//!
//! Students are created already approved, with a role number and with the
//! role number as their password, the same state an admin approval leaves
//! them in. Teachers and parents share [`DEMO_PASSWORD`].

use std::time::Instant;

use fake::Fake;
use fake::faker::name::en::*;
use rayon::prelude::*;
use schoolhub_core::password::hash_password;
use schoolhub_models::{ClassId, UserId};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use super::models::{DemoConfig, UserSeed};
use super::{DEMO_PASSWORD, SeedResult};

const BATCH_SIZE: usize = 500;
const DEMO_DOMAIN: &str = "example.com";

fn demo_email(first: &str, last: &str, role: &str, idx: usize) -> String {
    format!(
        "{}.{}+{}{}@{}",
        first.to_lowercase(),
        last.to_lowercase(),
        role,
        idx,
        DEMO_DOMAIN
    )
    .replace(['\'', ' '], "")
}

fn demo_phone(idx: usize) -> String {
    format!("+91{}", 9_000_000_000u64 + idx as u64)
}

/// Region prefix and zero-padded sequence, e.g. `DE007`.
pub fn demo_role_number(region: &str, seq: usize) -> String {
    let prefix: String = region.chars().take(2).collect::<String>().to_uppercase();
    format!("{prefix}{seq:03}")
}

fn generate_user(role: &str, idx: usize) -> UserSeed {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();

    UserSeed {
        email: demo_email(&first_name, &last_name, role, idx),
        full_name: format!("{first_name} {last_name}"),
        phone: demo_phone(idx),
        class_id: None,
        role_number: None,
        academic_region: None,
    }
}

/// Generates students for every class, numbering role numbers from 1.
pub fn generate_students(classes: &[ClassId], config: &DemoConfig) -> Vec<UserSeed> {
    classes
        .par_iter()
        .enumerate()
        .flat_map(|(class_idx, &class_id)| {
            (0..config.students_per_class)
                .map(|i| {
                    let seq = class_idx * config.students_per_class + i + 1;
                    UserSeed {
                        class_id: Some(class_id),
                        role_number: Some(demo_role_number(&config.region, seq)),
                        academic_region: Some(config.region.clone()),
                        ..generate_user("student", seq)
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn generate_teachers(count: usize) -> Vec<UserSeed> {
    (0..count)
        .into_par_iter()
        .map(|i| generate_user("teacher", i))
        .collect()
}

/// Seeds teachers, students and parents for every existing class.
pub async fn seed_demo(db: &PgPool, config: DemoConfig) -> SeedResult<()> {
    let start_time = Instant::now();

    let classes: Vec<ClassId> = sqlx::query_scalar(
        "SELECT id FROM classes ORDER BY NULLIF(regexp_replace(class_name, '\\D', '', 'g'), '')::int NULLS LAST",
    )
    .fetch_all(db)
    .await?;

    if classes.is_empty() {
        return Err("No classes found. Run `seed-classes` first.".into());
    }

    let shared_hash =
        hash_password(DEMO_PASSWORD).map_err(|e| format!("Failed to hash password: {}", e.error))?;

    println!("👩‍🏫 Seeding {} teachers...", config.teachers);
    let teachers = generate_teachers(config.teachers);
    let teacher_hashes = vec![shared_hash.clone(); teachers.len()];

    println!(
        "🎓 Seeding {} students ({} per class)...",
        config.total_students(classes.len()),
        config.students_per_class
    );
    let students = generate_students(&classes, &config);
    // Each student logs in with their role number, so every hash differs.
    let student_hashes = students
        .par_iter()
        .map(|s| hash_password(s.role_number.as_deref().unwrap_or_default()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let mut tx = db.begin().await?;

    let teacher_count = insert_users(&mut tx, "teacher", &teachers, &teacher_hashes).await?;
    let student_count = insert_users(&mut tx, "student", &students, &student_hashes).await?;

    let per_parent = config.students_per_parent.max(1);
    let mut parent_count = 0;
    for (family_idx, family) in students.chunks(per_parent).enumerate() {
        let parent = generate_user("parent", family_idx);
        let parent_id: Option<UserId> = sqlx::query_scalar(
            r#"
            INSERT INTO users (role, full_name, email, phone, password_hash, is_email_verified)
            VALUES ('parent', $1, $2, $3, $4, TRUE)
            ON CONFLICT DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&parent.full_name)
        .bind(&parent.email)
        .bind(&parent.phone)
        .bind(&shared_hash)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(parent_id) = parent_id else { continue };
        parent_count += 1;

        for (i, student) in family.iter().enumerate() {
            let Some(role_number) = &student.role_number else { continue };
            sqlx::query(
                r#"
                INSERT INTO parent_students (parent_id, student_role_number, relationship)
                VALUES ($1, $2, $3)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(parent_id)
            .bind(role_number)
            .bind(if i % 2 == 0 { "Mother" } else { "Father" })
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} teachers, {} students and {} parents in {:?}",
        teacher_count,
        student_count,
        parent_count,
        start_time.elapsed()
    );
    println!("   Teachers and parents log in with '{DEMO_PASSWORD}', students with their role number");

    Ok(())
}

async fn insert_users(
    tx: &mut Transaction<'_, Postgres>,
    role: &str,
    users: &[UserSeed],
    password_hashes: &[String],
) -> SeedResult<u64> {
    let mut inserted = 0;

    for (chunk, hashes) in users.chunks(BATCH_SIZE).zip(password_hashes.chunks(BATCH_SIZE)) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO users (role, full_name, email, phone, password_hash, is_email_verified, \
             class_id, role_number, academic_region, student_status, registration_source, \
             teacher_status, qualification, gender) ",
        );

        builder.push_values(chunk.iter().zip(hashes), |mut row, (user, hash)| {
            let is_student = role == "student";
            row.push_bind(role)
                .push_unseparated("::user_role")
                .push_bind(&user.full_name)
                .push_bind(&user.email)
                .push_bind(&user.phone)
                .push_bind(hash)
                .push_bind(true)
                .push_bind(user.class_id)
                .push_bind(&user.role_number)
                .push_bind(&user.academic_region)
                .push_bind(is_student.then_some("approved"))
                .push_unseparated("::approval_status")
                .push_bind(is_student.then_some("admin"))
                .push_unseparated("::registration_source")
                .push_bind((!is_student).then_some("approved"))
                .push_unseparated("::approval_status")
                .push_bind((!is_student).then_some("B.Ed"))
                .push_bind((!is_student).then_some("Other"));
        });
        builder.push(" ON CONFLICT DO NOTHING");

        inserted += builder.build().execute(&mut **tx).await?.rows_affected();
    }

    Ok(inserted)
}

/// Removes every demo account. Links of demo parents go with them.
pub async fn clear_demo(db: &PgPool) -> SeedResult<u64> {
    let start_time = Instant::now();
    println!("🗑️  Clearing demo users...");

    let deleted = sqlx::query("DELETE FROM users WHERE email LIKE $1 AND role <> 'admin'")
        .bind(format!("%@{DEMO_DOMAIN}"))
        .execute(db)
        .await?
        .rows_affected();

    println!("   ✓ Deleted {} users in {:?}", deleted, start_time.elapsed());

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_role_number() {
        assert_eq!(demo_role_number("Demo", 7), "DE007");
        assert_eq!(demo_role_number("north", 12), "NO012");
    }

    #[test]
    fn test_generate_students_numbers_sequentially() {
        let classes = vec![ClassId::new(), ClassId::new()];
        let config = DemoConfig::new(3);
        let students = generate_students(&classes, &config);
        assert_eq!(students.len(), 6);

        let mut numbers: Vec<_> = students
            .iter()
            .filter_map(|s| s.role_number.clone())
            .collect();
        numbers.sort();
        assert_eq!(numbers.first().map(String::as_str), Some("DE001"));
        assert_eq!(numbers.last().map(String::as_str), Some("DE006"));
        assert!(students.iter().all(|s| s.email.ends_with("@example.com")));
    }

    #[test]
    fn test_demo_phone_is_valid() {
        assert!(schoolhub_models::value_types::validate_phone(&demo_phone(42)).is_ok());
    }
}
