use std::path::PathBuf;

use anyhow::{Context as _, Result};
use structopt::StructOpt;

use strata::{
    all_write_transforms, analysis, find_config, trace, LoaderConfig,
    TraceOptions, WriteTransformOptions,
};

#[derive(StructOpt)]
#[structopt(about = "Static AMD/CommonJS module tracer")]
enum StrataCommands {
    /// Trace the build layer for a module id
    Trace {
        /// File containing a require.config() call
        #[structopt(short, long, parse(from_os_str))]
        config: Option<PathBuf>,

        /// Include module contents in the output
        #[structopt(short = "i", long)]
        include_contents: bool,

        /// Run the write transform pipeline over the contents
        #[structopt(short = "t", long)]
        transform: bool,

        /// Module ids to stub out in the transformed contents
        #[structopt(short, long)]
        stub: Vec<String>,

        /// Skip require() calls nested in factory bodies
        #[structopt(long)]
        no_nested: bool,

        /// Module id to trace
        id: String,
    },

    /// Print the declared dependencies of a module file
    Deps {
        /// Only scan for CommonJS require() calls
        #[structopt(short, long)]
        cjs: bool,

        /// Module file
        #[structopt(parse(from_os_str))]
        module: PathBuf,
    },

    /// Extract the loader config from a file
    Config {
        /// File containing a require.config() call
        #[structopt(parse(from_os_str))]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").ok().is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    let args = StrataCommands::from_args();
    match args {
        StrataCommands::Trace {
            config,
            include_contents,
            transform,
            stub,
            no_nested,
            id,
        } => run_trace(config, include_contents, transform, stub, no_nested, id)?,
        StrataCommands::Deps { cjs, module } => deps(cjs, module)?,
        StrataCommands::Config { file } => config_extract(file)?,
    }
    Ok(())
}

fn run_trace(
    config: Option<PathBuf>,
    include_contents: bool,
    transform: bool,
    stub: Vec<String>,
    no_nested: bool,
    id: String,
) -> Result<()> {
    let loader_config = match config {
        Some(file) => {
            let contents = read_file(&file)?;
            LoaderConfig::from_value(find_config(&contents)?)?
        }
        None => Default::default(),
    };

    let mut options = TraceOptions::new(id);
    options.include_contents = include_contents;
    options.find_nested_dependencies = !no_nested;
    if transform || !stub.is_empty() {
        options.write_transform =
            Some(all_write_transforms(WriteTransformOptions {
                stub_modules: stub,
                ..Default::default()
            }));
    }

    let result = trace(options, loader_config)?;
    for warning in &result.warnings {
        log::warn!("{}", warning);
    }
    println!("{}", serde_json::to_string_pretty(&result.traced)?);
    Ok(())
}

fn deps(cjs: bool, module: PathBuf) -> Result<()> {
    let contents = read_file(&module)?;
    let id = module.to_string_lossy();
    let list = if cjs {
        analysis::find_cjs_dependencies(&id, &contents)?
    } else {
        analysis::find_dependencies(&id, &contents)?
    };
    for (module, param) in list.modules.iter().zip(list.params.iter()) {
        println!("{} as {}", module, param);
    }
    Ok(())
}

fn config_extract(file: PathBuf) -> Result<()> {
    let contents = read_file(&file)?;
    let value = find_config(&contents)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn read_file(file: &PathBuf) -> Result<String> {
    std::fs::read_to_string(file)
        .context(format!("Unable to read {}", file.display()))
}
