use clap::Parser;
use keydash::cli::commands::edit::EditFlags;
use keydash::cli::{validate_user_id, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Validate the user id early to catch quoting mistakes.
    if let Some(user) = &cli.user {
        if let Err(e) = validate_user_id(user) {
            keydash::cli::output::error(&e.to_string());
            std::process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::List { sort, desc } => {
            keydash::cli::commands::list::execute(&cli, sort, desc).await
        }
        Commands::Create {
            ref name,
            ref secret,
            generate,
            limit,
        } => {
            keydash::cli::commands::create::execute(
                &cli,
                name.as_deref(),
                secret.as_deref(),
                generate,
                limit,
            )
            .await
        }
        Commands::Edit {
            ref id,
            ref name,
            ref secret,
            limit,
            unlimited,
        } => {
            let flags = EditFlags {
                name: name.as_deref(),
                secret: secret.as_deref(),
                limit,
                unlimited,
            };
            keydash::cli::commands::edit::execute(&cli, id, flags).await
        }
        Commands::View { ref id, copy } => {
            keydash::cli::commands::view::execute(&cli, id, copy).await
        }
        Commands::Copy { ref id } => keydash::cli::commands::copy::execute(&cli, id).await,
        Commands::Delete { ref id, force } => {
            keydash::cli::commands::delete::execute(&cli, id, force).await
        }
        Commands::Dashboard => keydash::cli::commands::dashboard::execute(&cli).await,
        Commands::Completions { shell } => keydash::cli::commands::completions::execute(shell),
    };

    if let Err(e) = result {
        keydash::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
