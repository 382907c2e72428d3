// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use crosswire::{
    base_stack::{compose_base, BaseStackSettings},
    config::StackConfig,
    constants::{CFG_BASE_STACK, STACK_BASE},
    pipeline_stack::{compose_pipeline, ComposedPipeline, PipelineStackSettings},
    plan::PlanEngines,
    stack::{InMemoryBackend, Stack, StackBackend, StackOutputs},
    state::FileBackend,
};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "crosswire", version, about = "Cross-stack ML platform composition")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a deterministic preview of a stack's resource plan
    Preview {
        /// Stack to preview
        #[arg(value_enum)]
        stack: StackKind,

        /// Deploy-time configuration, repeatable as `--config key=value`
        #[arg(long = "config", value_name = "KEY=VALUE")]
        config: Vec<String>,

        /// JSON state file holding published outputs of deployed stacks
        #[arg(long)]
        state: Option<PathBuf>,

        /// Also render the declared Kubernetes manifests as YAML
        #[arg(long)]
        manifests: bool,
    },

    /// Print the published outputs of a deployed stack
    Outputs {
        /// Stack name to look up
        stack: String,

        /// JSON state file holding published outputs
        #[arg(long, default_value = "state.json")]
        state: PathBuf,

        /// Print secret values instead of redacting them
        #[arg(long)]
        show_secrets: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StackKind {
    /// Shared infrastructure: cluster, database, buckets, router, tracking
    Base,
    /// Model serving against a deployed base stack
    Pipeline,
}

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("crosswire-cli")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Initialize logging with custom format
    //
    // Respects RUST_LOG environment variable if set, otherwise defaults to WARN
    // so previews stay readable; RUST_LOG_FORMAT=json switches to JSON output.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    let cli = Cli::parse();
    match cli.command {
        Command::Preview {
            stack,
            config,
            state,
            manifests,
        } => preview(stack, &config, state, manifests).await,
        Command::Outputs {
            stack,
            state,
            show_secrets,
        } => outputs(&stack, &state, show_secrets),
        Command::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "crosswire",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

/// Parse repeated `key=value` flags into a stack configuration.
fn parse_config(pairs: &[String]) -> Result<StackConfig> {
    let mut config = StackConfig::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid --config '{pair}', expected key=value");
        };
        config.set(key, value);
    }
    Ok(config)
}

async fn preview(
    kind: StackKind,
    config_pairs: &[String],
    state: Option<PathBuf>,
    manifests: bool,
) -> Result<()> {
    let config = parse_config(config_pairs)?;

    match kind {
        StackKind::Base => {
            info!("previewing base stack");
            let engines = PlanEngines::engines();
            let base = compose_base(&engines, BaseStackSettings::default()).await?;

            print_plan(&base.stack)?;
            print_outputs(&base.outputs, false);
            if manifests {
                print_base_manifests(&base)?;
            }
        }
        StackKind::Pipeline => {
            info!("previewing pipeline stack");
            let pipeline = match state {
                // Published outputs of a deployed base stack.
                Some(path) => {
                    debug!(path = %path.display(), "resolving upstream outputs from state file");
                    let backend = FileBackend::new(path);
                    preview_pipeline(&backend, &config).await?
                }
                // No deployed base stack: preview one in memory and resolve
                // the pipeline against its placeholder outputs.
                None => {
                    let engines = PlanEngines::engines();
                    let base = compose_base(&engines, BaseStackSettings::default()).await?;
                    let mut backend = InMemoryBackend::new();
                    let base_name = config.get(CFG_BASE_STACK).unwrap_or(STACK_BASE);
                    backend.register(base_name, base.outputs.clone());
                    let mut config = config.clone();
                    config.set(CFG_BASE_STACK, base_name);
                    preview_pipeline(&backend, &config).await?
                }
            };

            print_plan(&pipeline.stack)?;
            println!();
            println!(
                "Route: {} -> {}/{}",
                pipeline.route.prefix(),
                pipeline.service_handle.namespace,
                pipeline.service_handle.name
            );
            println!("Image: {}", pipeline.image.image_ref);
            if manifests {
                print_pipeline_manifests(&pipeline)?;
            }
        }
    }
    Ok(())
}

async fn preview_pipeline(
    backend: &dyn StackBackend,
    config: &StackConfig,
) -> Result<ComposedPipeline> {
    let engines = PlanEngines;
    compose_pipeline(&engines, backend, config, PipelineStackSettings::default())
        .await
        .context("pipeline preview failed")
}

fn print_plan(stack: &Stack) -> Result<()> {
    println!("Stack: {}", stack.name());
    println!();
    let order = stack.graph().toposort()?;
    for (index, name) in order.iter().enumerate() {
        let Some(kind) = stack.graph().kind_of(name) else {
            continue;
        };
        let producers = stack.graph().producers_of(name);
        if producers.is_empty() {
            println!("{:>3}. [{kind}] {name}", index + 1);
        } else {
            let list: Vec<&str> = producers.into_iter().collect();
            println!("{:>3}. [{kind}] {name}  (after: {})", index + 1, list.join(", "));
        }
    }
    Ok(())
}

fn print_outputs(outputs: &StackOutputs, show_secrets: bool) {
    println!();
    println!("Outputs:");
    for (name, value) in outputs.iter() {
        if show_secrets {
            println!("  {name} = {}", value.as_str());
        } else {
            println!("  {name} = {value}");
        }
    }
}

fn print_base_manifests(base: &crosswire::base_stack::ComposedBase) -> Result<()> {
    print_core_manifest(&base.tracking_namespace)?;
    print_core_manifest(base.tracking_binding.service_account())?;
    print_core_manifest(base.models_binding.service_account())?;
    print_manifest(base.tracking_route.middleware())?;
    print_manifest(base.tracking_route.ingress_route())?;
    Ok(())
}

fn print_pipeline_manifests(pipeline: &ComposedPipeline) -> Result<()> {
    print_core_manifest(&pipeline.deployment)?;
    print_core_manifest(&pipeline.service)?;
    print_manifest(pipeline.route.middleware())?;
    print_manifest(pipeline.route.ingress_route())?;
    Ok(())
}

/// Render a kube-derived custom resource; its serialization already carries
/// `apiVersion` and `kind`.
fn print_manifest<T: serde::Serialize>(manifest: &T) -> Result<()> {
    println!("---");
    print!("{}", serde_yaml::to_string(manifest)?);
    Ok(())
}

/// Render a `k8s-openapi` core type, injecting the `apiVersion` and `kind`
/// its `Serialize` impl leaves out.
fn print_core_manifest<T: serde::Serialize + k8s_openapi::Resource>(manifest: &T) -> Result<()> {
    let mut value = serde_json::to_value(manifest)?;
    if let Some(map) = value.as_object_mut() {
        map.insert("apiVersion".to_string(), T::API_VERSION.into());
        map.insert("kind".to_string(), T::KIND.into());
    }
    println!("---");
    print!("{}", serde_yaml::to_string(&value)?);
    Ok(())
}

fn outputs(stack: &str, state: &std::path::Path, show_secrets: bool) -> Result<()> {
    let backend = FileBackend::new(state);
    let outputs = backend
        .resolve(stack)
        .with_context(|| format!("failed to resolve stack '{stack}'"))?;
    println!("Stack: {stack} (published {})", outputs.published_at());
    print_outputs(&outputs, show_secrets);
    Ok(())
}
