use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::process;
use std::time::Instant;
use thermal_overlay::{
    mark_reading, ColormapKind, Frame, OverlayConfig, Pipeline, PointReading, PointStyle, ScalarField,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn print_usage(program: &str) {
    eprintln!("Thermal Overlay Compositor");
    eprintln!();
    eprintln!("Usage: {} <input-image> <field.csv> <output-image> [OPTIONS]", program);
    eprintln!();
    eprintln!("The field file holds one grid row per line, values separated by");
    eprintln!("commas or whitespace. Lines starting with '#' are ignored.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --alpha <A>          Overlay weight 0.0-1.0 (default: 0.5)");
    eprintln!("  --colormap <NAME>    jet, hot or gray (default: jet)");
    eprintln!("  --no-invert          Do not invert the normalized field before lookup");
    eprintln!("  --radius <N>         Hotspot marker radius in pixels (default: 10)");
    eprintln!("  --point <T,X,Y>      Also mark a point reading at normalized X,Y");
    eprintln!("  --log                Show detailed processing information");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} frame.png thermal.csv overlay.png", program);
    eprintln!("  {} frame.jpg thermal.csv overlay.png --alpha 0.3 --colormap hot", program);
    eprintln!("  {} frame.png thermal.csv overlay.png --point 36.6,0.5,0.4 --log", program);
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    match args.get(i + 1) {
        Some(v) => Ok(v.as_str()),
        None => bail!("{} requires a value", flag),
    }
}

/// Parse a text grid: one row per line, comma or whitespace separated.
fn parse_field(text: &str) -> Result<ScalarField> {
    let mut rows: Vec<Vec<f32>> = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|tok| !tok.is_empty())
            .map(|tok| {
                tok.parse::<f32>()
                    .with_context(|| format!("line {}: invalid value '{}'", lineno + 1, tok))
            })
            .collect::<Result<Vec<f32>>>()?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                bail!(
                    "line {}: expected {} values, found {}",
                    lineno + 1,
                    first.len(),
                    row.len()
                );
            }
        }
        rows.push(row);
    }
    ScalarField::from_rows(&rows).context("Field file holds no samples")
}

fn parse_point(spec: &str) -> Result<PointReading> {
    let values = spec
        .split(',')
        .map(|tok| tok.trim().parse::<f32>())
        .collect::<std::result::Result<Vec<f32>, _>>()
        .context("Invalid --point value")?;
    Ok(PointReading::from_flat(&values)?)
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage(&args[0]);
        return Ok(());
    }

    if args.len() < 4 {
        print_usage(&args[0]);
        bail!("Missing required arguments");
    }

    let input_path = &args[1];
    let field_path = &args[2];
    let output_path = &args[3];

    // Parse optional arguments
    let mut config = OverlayConfig::new();
    let mut point = None;
    let mut log_enabled = false;

    let mut i = 4;
    while i < args.len() {
        match args[i].as_str() {
            "--alpha" => {
                let alpha = value_of(&args, i, "--alpha")?
                    .parse::<f32>()
                    .context("Invalid alpha value")?;
                config = config.with_alpha(alpha);
                i += 2;
            }
            "--colormap" => {
                let name = value_of(&args, i, "--colormap")?;
                let kind = ColormapKind::parse(name)
                    .with_context(|| format!("Unknown colormap: {}", name))?;
                config = config.with_colormap(kind);
                i += 2;
            }
            "--no-invert" => {
                config = config.with_colormap_invert(false);
                i += 1;
            }
            "--radius" => {
                let radius = value_of(&args, i, "--radius")?
                    .parse::<u32>()
                    .context("Invalid radius")?;
                config = config.with_hotspot_radius(radius);
                i += 2;
            }
            "--point" => {
                point = Some(parse_point(value_of(&args, i, "--point")?)?);
                i += 2;
            }
            "--log" => {
                log_enabled = true;
                i += 1;
            }
            other => bail!("Unknown option: {}", other),
        }
    }

    init_logging(log_enabled);
    config.validate()?;

    let started = Instant::now();
    let img = image::open(input_path)
        .with_context(|| format!("Failed to open {}", input_path))?
        .to_rgb8();
    let frame = Frame::from_rgb_image(img);

    let text = fs::read_to_string(field_path)
        .with_context(|| format!("Failed to read {}", field_path))?;
    let field = parse_field(&text).with_context(|| format!("Failed to parse {}", field_path))?;

    tracing::debug!(
        width = frame.width(),
        height = frame.height(),
        field_rows = field.rows(),
        field_cols = field.cols(),
        colormap = config.colormap.label(),
        alpha = config.style.alpha,
        "inputs loaded"
    );

    let rendered = Pipeline::from_config(&config)
        .render(&frame, &field)
        .context("Overlay failed")?;

    tracing::info!(
        x = rendered.hotspot.x,
        y = rendered.hotspot.y,
        max = rendered.hotspot.value,
        min = rendered.observed_min,
        "hotspot located"
    );

    let mut output = rendered.frame;
    if let Some(reading) = point {
        output = mark_reading(&output, &reading, &PointStyle::default());
    }

    output
        .to_rgb_image()
        .context("Failed to create image buffer")?
        .save(output_path)
        .with_context(|| format!("Failed to save {}", output_path))?;

    tracing::info!(
        output = %output_path,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "overlay written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_csv_and_whitespace() {
        let field = parse_field("# sensor dump\n10, 20\n30 40\n\n").unwrap();
        assert_eq!(field.shape(), (2, 2));
        assert_eq!(field.get(1, 0), 30.0);
    }

    #[test]
    fn test_parse_field_ragged_rejected() {
        assert!(parse_field("1,2,3\n4,5\n").is_err());
        assert!(parse_field("1,x\n").is_err());
        assert!(parse_field("# nothing\n").is_err());
    }

    #[test]
    fn test_parse_point() {
        let p = parse_point("36.6, 0.5, 0.25").unwrap();
        assert_eq!((p.temperature, p.norm_x, p.norm_y), (36.6, 0.5, 0.25));
        assert!(parse_point("1,2").is_err());
    }
}
