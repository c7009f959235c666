use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use eduhub::config::EduHubConfig;
use eduhub::model::{Enrollment, EntityKind, Lesson, Role, User};
use eduhub::{EduHub, EduHubError, SeedGenerator};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process;

/// EduHub CLI: set up, seed and query an EduHub data store
#[derive(Parser)]
#[command(name = "eduhub", version, about)]
struct Cli {
    /// Database file (overrides store.path; `:memory:` for a throwaway store)
    #[arg(long, env = "EDUHUB_DB")]
    db: Option<PathBuf>,

    /// Configuration file (YAML)
    #[arg(long, env = "EDUHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Create collections with validators and apply the index plan
    Setup,

    /// Insert synthetic users, courses, lessons, enrollments and assignments
    Seed {
        #[arg(long, default_value_t = 20)]
        users: usize,
        #[arg(long, default_value_t = 8)]
        courses: usize,
        #[arg(long, default_value_t = 0)]
        lessons: usize,
        #[arg(long, default_value_t = 0)]
        enrollments: usize,
        #[arg(long, default_value_t = 0)]
        assignments: usize,
    },

    /// List users with role student and isActive true
    ActiveStudents,

    /// Enrollment count per course
    EnrollmentStats,

    /// Show the query plan for a user lookup by email
    ExplainEmail {
        email: String,
    },

    /// Insert one document through the write gateway
    Insert {
        /// Collection name (e.g. users) or entity kind (e.g. user)
        collection: String,
        /// Field values (e.g. --field email=user1@edu.africa)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Replay the full flow: setup, seed, queries, explain and a duplicate insert
    Demo,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s.find('=').ok_or_else(|| {
        format!("Invalid key=value pair: no '=' found in '{s}'")
    })?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<EduHubConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => EduHubConfig::load(path)?,
        None => EduHubConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.store.path = db.clone();
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    let hub = EduHub::open(&config)?;

    match cli.command {
        Command::Setup => {
            let report = hub.setup()?;
            print_output(&report, &cli.format)?;
        }

        Command::Seed {
            users,
            courses,
            lessons,
            enrollments,
            assignments,
        } => {
            hub.setup()?;
            let seed = SeedGenerator::new();
            let gateway = hub.gateway();
            let mut inserted = serde_json::Map::new();
            for (kind, count) in [
                (EntityKind::User, users),
                (EntityKind::Course, courses),
                (EntityKind::Lesson, lessons),
                (EntityKind::Enrollment, enrollments),
                (EntityKind::Assignment, assignments),
            ] {
                let ids = gateway.insert_many(kind, &seed.generate(kind, count)?)?;
                log::info!("Seeded {} documents into {kind}", ids.len());
                inserted.insert(kind.collection().to_string(), json!(ids.len()));
            }
            print_output(&json!({ "inserted": inserted }), &cli.format)?;
        }

        Command::ActiveStudents => {
            let students = hub.queries().find_active_students()?;
            print_output(&students, &cli.format)?;
        }

        Command::EnrollmentStats => {
            let stats = hub.queries().course_enrollment_stats()?;
            print_output(&stats, &cli.format)?;
        }

        Command::ExplainEmail { email } => {
            let plan = hub.queries().explain_email_lookup(&email)?;
            print_output(&plan, &cli.format)?;
        }

        Command::Insert { collection, fields } => {
            let kind: EntityKind = collection.parse()?;
            let data = fields_to_value(&fields);
            let id = hub.gateway().insert(kind, &data)?;
            print_output(&json!({ "insertedId": id }), &cli.format)?;
        }

        Command::Demo => demo(&hub, &cli.format)?,
    }

    Ok(())
}

/// The end-to-end walkthrough of the data layer.
fn demo(hub: &EduHub, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let setup = hub.setup()?;
    let seed = SeedGenerator::new();
    let gateway = hub.gateway();
    let queries = hub.queries();

    let users = gateway.insert_entities(&seed.users(20))?;
    let courses = gateway.insert_entities(&seed.courses(8))?;

    let enrollment = gateway.insert_entity(&Enrollment {
        student_id: "user2".into(),
        course_id: "course1".into(),
        enrolled_at: Utc::now(),
        progress: 0.0,
        completed: false,
    })?;

    let lesson = gateway.insert_entity(&Lesson {
        lesson_id: "lesson1".into(),
        course_id: "course1".into(),
        title: "The Mali Empire".into(),
        content: "A deep dive into Mali's rise and culture.".into(),
        order: 1,
        duration: 30.0,
        resources: Vec::new(),
    })?;

    let active_students: Vec<String> = queries
        .find_active_students()?
        .into_iter()
        .map(|doc| doc.data.user_id)
        .collect();
    let stats = queries.course_enrollment_stats()?;
    let explain = queries.explain_email_lookup("user1@edu.africa")?;

    // A bare duplicate fails validation before uniqueness is checked; a
    // complete one reaches the unique email index.
    let partial = gateway.insert(
        EntityKind::User,
        &json!({ "userId": "user1", "email": "user1@edu.africa" }),
    );
    let complete = gateway.insert_entity(&User {
        user_id: "user1".into(),
        email: "user1@edu.africa".into(),
        first_name: "First1".into(),
        last_name: "Last1".into(),
        role: Role::Instructor,
        date_joined: Utc::now(),
        profile: None,
        is_active: Some(true),
    });

    print_output(
        &json!({
            "setup": setup,
            "inserted": {
                "users": users.len(),
                "courses": courses.len(),
                "enrollment": enrollment,
                "lesson": lesson,
            },
            "active_students": active_students,
            "course_enrollment_stats": stats,
            "explain_email_lookup": explain,
            "duplicate_user": {
                "partial": insert_outcome(partial),
                "complete": insert_outcome(complete),
            },
        }),
        format,
    )
}

fn insert_outcome(result: Result<String, EduHubError>) -> Value {
    match result {
        Ok(id) => json!({ "insertedId": id }),
        Err(e) => {
            let kind = match &e {
                EduHubError::SchemaViolation(_) => "schema_violation",
                EduHubError::DuplicateKey { .. } => "duplicate_key",
                _ => "error",
            };
            json!({ "error": kind, "message": e.to_string() })
        }
    }
}

fn print_output<T: Serialize>(
    value: &T,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

fn fields_to_value(fields: &[(String, String)]) -> Value {
    let mut map = serde_json::Map::new();
    for (key, val) in fields {
        // Try to parse as JSON value (for numbers, booleans, arrays, objects)
        let json_val = serde_json::from_str(val).unwrap_or(Value::String(val.clone()));
        map.insert(key.clone(), json_val);
    }
    Value::Object(map)
}
