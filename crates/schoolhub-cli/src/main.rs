use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use schoolhub_cli::seeder::{self, DemoConfig};
use schoolhub_core::password::{MIN_PASSWORD_LENGTH, hash_password};
use schoolhub_models::value_types::normalize_email;

#[derive(Parser)]
#[command(name = "schoolhub-cli")]
#[command(about = "SchoolHub CLI - Administrative tools for SchoolHub", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a verified administrator account
    CreateAdmin {
        /// Full name of the admin
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Create classes 1-10 with their standard subjects
    SeedClasses,
    /// Seed fake teachers, approved students and linked parents
    SeedDemo {
        /// Number of teachers
        #[arg(long, default_value = "5")]
        teachers: usize,

        /// Number of students per class
        #[arg(long, default_value = "10")]
        students: usize,

        /// Number of students linked to each parent
        #[arg(long, default_value = "2")]
        students_per_parent: usize,

        /// Academic region of the demo students (prefixes their role numbers)
        #[arg(long, default_value = "Demo")]
        region: String,
    },
    /// Remove every demo account (keeps admins)
    ClearDemo,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    dotenv().ok();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("\n❌ {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult {
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    match cli.command {
        Commands::CreateAdmin {
            name,
            email,
            password,
        } => handle_create_admin(&pool, name, email, password).await,
        Commands::SeedClasses => {
            seeder::seed_classes(&pool).await?;
            println!("\n✅ Classes seeded");
            Ok(())
        }
        Commands::SeedDemo {
            teachers,
            students,
            students_per_parent,
            region,
        } => {
            let config = DemoConfig {
                teachers,
                students_per_class: students,
                students_per_parent,
                region,
            };
            seeder::seed_demo(&pool, config).await?;
            println!("\n✅ Demo data seeded");
            Ok(())
        }
        Commands::ClearDemo => {
            seeder::clear_demo(&pool).await?;
            println!("\n✅ Demo data cleared");
            Ok(())
        }
    }
}

async fn handle_create_admin(
    pool: &sqlx::postgres::PgPool,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> CliResult {
    let name = match name {
        Some(name) => name,
        None => Input::new().with_prompt("Full name").interact_text()?,
    };

    let email = match email {
        Some(email) => email,
        None => Input::new().with_prompt("Email address").interact_text()?,
    };

    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()?,
    };

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(format!("Password must be at least {MIN_PASSWORD_LENGTH} characters").into());
    }

    let email = normalize_email(&email);
    create_admin_internal(pool, &name, &email, &password).await?;

    println!("\n✅ Admin created successfully!");
    println!("   Email: {}", email);
    println!("   Name: {}", name);

    Ok(())
}

async fn create_admin_internal(
    db: &sqlx::postgres::PgPool,
    name: &str,
    email: &str,
    password: &str,
) -> CliResult {
    let hashed_password =
        hash_password(password).map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let user_id = sqlx::query_scalar::<_, uuid::Uuid>(
        "INSERT INTO users (role, full_name, email, password_hash, is_email_verified)
         VALUES ('admin', $1, $2, $3, TRUE)
         ON CONFLICT (email) DO NOTHING
         RETURNING id",
    )
    .bind(name)
    .bind(email)
    .bind(&hashed_password)
    .fetch_optional(db)
    .await?;

    if user_id.is_none() {
        return Err("User with this email already exists".into());
    }

    Ok(())
}
