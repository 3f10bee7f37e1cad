//! One-shot provisioning: apply the schema and promote an existing account
//! to super admin.

use anyhow::{bail, Context};
use clap::{error::ErrorKind, Parser};
use stride_server::db;

#[derive(Debug, Parser)]
#[command(
    name = "stride-setup",
    about = "Prepare a Stride database and grant super admin",
    long_about = "Apply the Stride schema to a database and promote an existing account to super admin.\n\
                  The account must already exist: sign up through the API first, then run this \
                  with the same email. Exits with status 1 if no account has that email."
)]
struct Args {
    /// Path to the SQLite database file
    #[arg(long, env = "DATABASE_PATH")]
    database: String,

    /// Email of an existing account to promote (matched case-insensitively)
    #[arg(long)]
    admin_email: String,
}

async fn run(args: Args) -> anyhow::Result<()> {
    let pool = db::init_pool(&args.database)
        .await
        .with_context(|| format!("cannot open database {}", args.database))?;

    let email = args.admin_email.trim().to_lowercase();
    let result = sqlx::query(r#"UPDATE "user" SET is_super_admin = 1, updatedAt = ? WHERE email = ?"#)
        .bind(db::timestamp())
        .bind(&email)
        .execute(&pool)
        .await
        .context("failed to update user")?;

    if result.rows_affected() == 0 {
        bail!("no account with email {}", email);
    }

    println!("{} is now a super admin", email);
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args).await {
        eprintln!("stride-setup: {:#}", e);
        std::process::exit(1);
    }
}
