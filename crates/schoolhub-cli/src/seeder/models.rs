//! Seed data and configuration types.

use schoolhub_models::ClassId;

/// Seed data for one subject of a class.
pub struct SubjectSeed {
    pub name: &'static str,
    pub description: &'static str,
}

/// Seed data for a demo account.
pub struct UserSeed {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub class_id: Option<ClassId>,
    pub role_number: Option<String>,
    pub academic_region: Option<String>,
}

/// How many demo accounts to create.
#[derive(Clone, Debug)]
pub struct DemoConfig {
    pub teachers: usize,
    pub students_per_class: usize,
    /// Each parent is linked to this many consecutive students.
    pub students_per_parent: usize,
    pub region: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            teachers: 5,
            students_per_class: 10,
            students_per_parent: 2,
            region: "Demo".to_string(),
        }
    }
}

impl DemoConfig {
    pub fn new(students_per_class: usize) -> Self {
        Self {
            students_per_class,
            ..Default::default()
        }
    }

    pub fn total_students(&self, classes: usize) -> usize {
        classes * self.students_per_class
    }
}
