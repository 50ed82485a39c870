use clap::{App, Arg};
use quire::build::publish;
use quire::config::Config;
use std::path::Path;
use std::process;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let matches = App::new("quire")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::with_name("PROJECT")
                .help("The project directory (or any directory beneath it)")
                .default_value("."),
        )
        .arg(
            Arg::with_name("debug")
                .long("debug")
                .help("Enables verbose logging"),
        )
        .arg(
            Arg::with_name("test")
                .long("test")
                .help("Writes an unminified site to `{project}/test` for local browsing"),
        )
        .get_matches();

    init_tracing(matches.is_present("debug"));

    let project = Path::new(matches.value_of("PROJECT").unwrap_or("."));
    let config = match Config::from_directory(project, matches.is_present("test")) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    if config.options.test {
        info!(output = %config.output_directory.display(), "test mode");
    }

    match publish(&config).await {
        Ok(published) => info!(
            posts = published.posts.len(),
            stylesheet = %published.stylesheet.display(),
            "published"
        ),
        Err(failure) => {
            error!("{}", failure);
            process::exit(1);
        }
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
