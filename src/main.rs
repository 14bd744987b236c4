//! Opens the configured school database, bootstraps the schema, reports what
//! it holds and closes the connection again. Useful as a health check for the
//! store that a front-end would sit on.
use school_records::{DatabaseConfig, SchoolDb};
use tracing::info;

/// Environment variable holding the tracing filter directives.
const LOG_ENV: &str = "SCHOOL_RECORDS_LOG";

fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let config = DatabaseConfig::from_env()?;
    let db = SchoolDb::connect(&config)?;

    let students = db.get_students()?;
    let teachers = db.get_teachers()?;
    let courses = db.get_courses()?;
    let unassigned = courses.iter().filter(|c| c.teacher.is_none()).count();

    info!(
        path = %config.path.display(),
        students = students.len(),
        teachers = teachers.len(),
        courses = courses.len(),
        unassigned,
        "school database ready"
    );

    db.close_connection();
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
