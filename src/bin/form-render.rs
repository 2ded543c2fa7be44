use formstack::{FormConfig, FormDocument, FormError, InputRegistry};
use std::env;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: form-render <form.yaml> [--config config.yaml]");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  form-render post.yaml");
        eprintln!("  form-render post.yaml --config labels.de.yaml");
        process::exit(1);
    }

    match run(&args[1..]) {
        Ok(html) => println!("{}", html),
        Err(e) => {
            eprintln!("✗ render failed:");
            print_error(&e);
            process::exit(1);
        }
    }
}

fn run(args: &[String]) -> Result<String, FormError> {
    let mut form_path: Option<&str> = None;
    let mut config_path: Option<&str> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or_else(|| {
                    FormError::Config("--config requires a file argument".to_string())
                })?;
                config_path = Some(path.as_str());
            }
            path if form_path.is_none() => form_path = Some(path),
            other => {
                return Err(FormError::Config(format!("Unexpected argument '{}'", other)));
            }
        }
    }

    let form_path =
        form_path.ok_or_else(|| FormError::Config("missing form document".to_string()))?;
    let config = match config_path {
        Some(path) => Some(FormConfig::load(path)?),
        None => None,
    };

    tracing::debug!(form = form_path, config = ?config_path, "rendering form document");
    let document = FormDocument::load(form_path)?;
    document.render(config.as_ref(), Arc::new(InputRegistry::with_defaults()))
}

fn print_error(error: &FormError) {
    match error {
        FormError::EmptyStack | FormError::UnbalancedStack { .. } => {
            eprintln!("  Internal error:");
            eprintln!("    {}", error);
        }
        FormError::UnknownInput { kind, searched } => {
            eprintln!("  Unknown input kind '{}':", kind);
            eprintln!("    Searched tiers: {}", searched);
        }
        FormError::UnknownField { model, field } => {
            eprintln!("  Unknown field '{}' on model '{}'", field, model);
        }
        FormError::Yaml(msg) => {
            eprintln!("  YAML error:");
            eprintln!("    {}", msg);
        }
        e => {
            eprintln!("  {}", e);
        }
    }
}
