#![forbid(unsafe_code)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use dg_grid::{CalculatedColumnConfig, Grid, GridConfig, SortKey};
use dg_io::{Dataset, read_csv_reader, renderer_by_name};

const DEFAULT_RENDERER: &str = "ascii";

#[derive(Debug, Clone, Default)]
struct CliArgs {
    input: Option<PathBuf>,
    renderer: Option<String>,
    config: Option<PathBuf>,
    overrides: GridConfig,
    help: bool,
}

fn main() -> ExitCode {
    match run(std::env::args().skip(1)) {
        Ok(output) => {
            print!("{output}");
            if !output.ends_with('\n') {
                println!();
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("rendergrid error: {error}");
            ExitCode::from(1)
        }
    }
}

fn run(args: impl IntoIterator<Item = String>) -> Result<String, String> {
    let args = parse_args(args)?;
    if args.help {
        return Ok(help_text());
    }

    let mut config = match args.config.as_deref() {
        Some(path) => load_config(path)?,
        None => GridConfig::default(),
    };
    merge(&mut config, args.overrides);

    let dataset = read_input(args.input.as_deref())?;
    let grid = Grid::from_config(dataset.rows, dataset.labels, &config)
        .map_err(|error| error.to_string())?;
    let mut renderer = renderer_by_name(args.renderer.as_deref().unwrap_or(DEFAULT_RENDERER))
        .map_err(|error| error.to_string())?;
    grid.render(renderer.as_mut())
        .map_err(|error| error.to_string())
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let overrides = &mut parsed.overrides;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--renderer" | "-r" => parsed.renderer = Some(value(&mut args, &arg)?),
            "--config" => parsed.config = Some(PathBuf::from(value(&mut args, &arg)?)),
            "--groupby" => overrides.groupby.push(value(&mut args, &arg)?),
            "--aggregate" => overrides.aggregate.push(value(&mut args, &arg)?),
            "--format" => overrides.formatters.push(value(&mut args, &arg)?),
            "--sortby" => {
                let key = value(&mut args, &arg)?
                    .parse::<SortKey>()
                    .map_err(|error| error.to_string())?;
                overrides.sortby.push(key);
            }
            "--columns" => {
                overrides.columns = value(&mut args, &arg)?
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_owned)
                    .collect();
            }
            "--calc" => {
                let entry = value(&mut args, &arg)?;
                let (name, formula) = entry
                    .split_once('=')
                    .ok_or_else(|| format!("--calc expects name=formula, got {entry:?}"))?;
                overrides.calculated_columns.push(CalculatedColumnConfig {
                    name: name.trim().to_owned(),
                    formula: formula.to_owned(),
                });
            }
            "--filter" => overrides.filters.push(value(&mut args, &arg)?),
            "--post-filter" => overrides.post_aggregate_filters.push(value(&mut args, &arg)?),
            "--suppress-detail" => overrides.suppressdetail = true,
            "--help" | "-h" => parsed.help = true,
            "-" => parsed.input = None,
            other if other.starts_with('-') => return Err(format!("unknown argument: {other}")),
            other => {
                if parsed.input.is_some() {
                    return Err(format!("unexpected extra input: {other}"));
                }
                parsed.input = Some(PathBuf::from(other));
            }
        }
    }

    Ok(parsed)
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{flag} requires a value"))
}

fn load_config(path: &Path) -> Result<GridConfig, String> {
    let text = fs::read_to_string(path).map_err(|error| format!("{}: {error}", path.display()))?;
    serde_json::from_str(&text).map_err(|error| format!("{}: {error}", path.display()))
}

/// Command-line settings extend the file's lists; `--columns` replaces.
fn merge(config: &mut GridConfig, overrides: GridConfig) {
    config.calculated_columns.extend(overrides.calculated_columns);
    config.groupby.extend(overrides.groupby);
    config.aggregate.extend(overrides.aggregate);
    config.formatters.extend(overrides.formatters);
    config.sortby.extend(overrides.sortby);
    config.filters.extend(overrides.filters);
    config.post_aggregate_filters.extend(overrides.post_aggregate_filters);
    config.rowstyles.extend(overrides.rowstyles);
    config.cellstyles.extend(overrides.cellstyles);
    config.columnstyles.extend(overrides.columnstyles);
    config.descriptions.extend(overrides.descriptions);
    if !overrides.columns.is_empty() {
        config.columns = overrides.columns;
    }
    config.suppressdetail |= overrides.suppressdetail;
}

fn read_input(path: Option<&Path>) -> Result<Dataset, String> {
    let dataset = match path {
        Some(path) => {
            let file =
                fs::File::open(path).map_err(|error| format!("{}: {error}", path.display()))?;
            read_csv_reader(file)
        }
        None => read_csv_reader(io::stdin().lock()),
    };
    dataset.map_err(|error| error.to_string())
}

fn help_text() -> String {
    "rendergrid\n\
     Usage:\n\
     \trendergrid [input.csv|-] [options]\n\
     Options:\n\
     \t-r, --renderer <name>      ascii (default), html, csv or json\n\
     \t--config <file.json>       load grid settings from a JSON file\n\
     \t--groupby <column>         group rows; repeat for nested groups\n\
     \t--aggregate <col|reducer>  sum, count, min, max or avg per group\n\
     \t--format <col|fmt[|fmt]>   printf template, percent[N] or quoted literal\n\
     \t--sortby <col[:desc]>      sort key; repeat for secondary keys\n\
     \t--columns <a,b,..>         displayed columns, in order\n\
     \t--calc <name=formula>      calculated column, e.g. total={price}*{qty}\n\
     \t--filter <predicate>       keep raw rows matching the predicate\n\
     \t--post-filter <predicate>  filter rows and groups after aggregation\n\
     \t--suppress-detail          show group summaries only\n\
     \t-h, --help                 show this help\n"
        .to_owned()
}
