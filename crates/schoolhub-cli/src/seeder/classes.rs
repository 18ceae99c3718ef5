//! Class and subject seeding.

use std::time::Instant;

use schoolhub_models::academics::default_subject_code;
use schoolhub_models::value_types::CLASS_NAMES;
use schoolhub_models::ClassId;
use sqlx::PgPool;

use super::SeedResult;
use super::models::SubjectSeed;

const fn subject(name: &'static str, description: &'static str) -> SubjectSeed {
    SubjectSeed { name, description }
}

static PRIMARY: [SubjectSeed; 6] = [
    subject("English", "Phonics, reading, simple sentences and storytelling."),
    subject("Mathematics", "Numbers, place value, addition, subtraction and shapes."),
    subject("Environmental Studies (EVS)", "Self, family, plants, animals and surroundings."),
    subject("Social Studies", "Family, school, neighbourhood and festivals."),
    subject("Art & Craft", "Drawing, colouring, clay modelling and paper craft."),
    subject("Physical and Health Education", "Exercises, group games and hygiene."),
];

static UPPER_PRIMARY: [SubjectSeed; 6] = [
    subject("English", "Comprehension, essay writing and grammar."),
    subject("Mathematics", "Multiplication, division, fractions and geometry."),
    subject("Science (Physics, Chemistry, Biology)", "Matter, living things, force and energy."),
    subject("Social Studies", "Maps, history of India and civic life."),
    subject("Art & Craft", "Perspective drawing, painting and design."),
    subject("Physical and Health Education", "Athletics, team sports and nutrition."),
];

static MIDDLE: [SubjectSeed; 6] = [
    subject("English", "Literature, composition and advanced grammar."),
    subject("Mathematics", "Algebra, ratios, mensuration and data handling."),
    subject("Science (Physics, Chemistry, Biology)", "Motion, chemical reactions and cells."),
    subject("Social Studies (Geography, History, Politics)", "Resources, medieval history and democracy."),
    subject("Computer Science", "Programming basics, spreadsheets and internet safety."),
    subject("Physical and Health Education", "Fitness, yoga and first aid."),
];

static SECONDARY: [SubjectSeed; 6] = [
    subject("English", "Prose, poetry, drama and formal writing."),
    subject("Applied Mathematics", "Polynomials, trigonometry, statistics and probability."),
    subject("Science (Physics, Chemistry, Biology)", "Electricity, carbon compounds and heredity."),
    subject("Social Studies (Geography, History, Politics)", "Nationalism, economics and federalism."),
    subject("Computer Science (Information Science)", "Python, databases and networks."),
    subject("Physical and Health Education", "Sports training, health and wellbeing."),
];

/// Subjects taught in a class, by class name.
pub fn syllabus(class_name: &str) -> &'static [SubjectSeed] {
    match class_name {
        "1" | "2" => &PRIMARY,
        "3" | "4" | "5" => &UPPER_PRIMARY,
        "6" | "7" | "8" => &MIDDLE,
        _ => &SECONDARY,
    }
}

/// Creates classes 1-10 and their subjects. Existing rows are kept, so the
/// command can be rerun safely. Returns the number of subjects inserted.
pub async fn seed_classes(db: &PgPool) -> SeedResult<u64> {
    let start_time = Instant::now();
    println!("📚 Seeding classes {} to {}...", CLASS_NAMES[0], CLASS_NAMES[9]);

    let mut tx = db.begin().await?;
    let mut inserted = 0;

    for class_name in CLASS_NAMES {
        let class_id: ClassId = sqlx::query_scalar(
            r#"
            INSERT INTO classes (class_name, class_code, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (class_name) DO UPDATE SET updated_at = classes.updated_at
            RETURNING id
            "#,
        )
        .bind(class_name)
        .bind(format!("CLASS{class_name}"))
        .bind(format!("Class {class_name}"))
        .fetch_one(&mut *tx)
        .await?;

        for seed in syllabus(class_name) {
            inserted += sqlx::query(
                r#"
                INSERT INTO subjects (subject_code, subject_name, description, class_id)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (subject_code) DO NOTHING
                "#,
            )
            .bind(default_subject_code(seed.name, class_name))
            .bind(seed.name)
            .bind(seed.description)
            .bind(class_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
    }

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} subjects in {:?}",
        inserted,
        start_time.elapsed()
    );

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_class_has_subjects() {
        for class_name in CLASS_NAMES {
            assert_eq!(syllabus(class_name).len(), 6);
        }
    }

    #[test]
    fn test_subject_codes_unique_per_class() {
        for class_name in CLASS_NAMES {
            let codes: HashSet<String> = syllabus(class_name)
                .iter()
                .map(|s| default_subject_code(s.name, class_name))
                .collect();
            assert_eq!(codes.len(), syllabus(class_name).len(), "class {class_name}");
        }
    }
}
