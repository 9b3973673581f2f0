use std::collections::VecDeque;
use std::error::Error;
use std::fs;
use std::time::Instant;

use nnprep::{
    decode, encode, fetch_labels, fetch_text, source::is_remote_url, top_classes, ByteSource,
    DecodedArray, FileSource, HttpSource,
};
use nnprep_imageio::{
    build_input_tensor, fetch_image, ChannelScheme, DrawOptions, InputOptions, TensorLayout,
};
use rten_tensor::prelude::*;

mod env;
mod list;

use env::verbose_from_env;
use list::{parse_array, parse_list};

/// Settings which override those from an input options file.
#[derive(Default)]
struct ImageOverrides {
    dims: Option<[usize; 4]>,
    mean: Option<Vec<f32>>,
    std: Option<Vec<f32>>,
    norm: bool,
    imagenet: bool,
    bgr: bool,
    layout: Option<TensorLayout>,
    scaled: bool,
    crop: Option<[u32; 6]>,
}

enum Command {
    /// Convert an image into an input tensor.
    Image {
        image: String,
        config: Option<String>,
        overrides: ImageOverrides,
        output: Option<String>,
    },

    /// Print the type, shape and leading values of a `.npy` file.
    Npy { url: String },

    /// Print the top classes from a `.npy` file of scores.
    Classify {
        scores: String,
        labels: String,
        json: bool,
    },
}

struct Args {
    command: Command,

    /// Log timings and details to stderr.
    verbose: bool,
}

fn parse_args() -> Result<Args, lexopt::Error> {
    use lexopt::prelude::*;

    let mut values = VecDeque::new();
    let mut overrides = ImageOverrides::default();
    let mut config = None;
    let mut output = None;
    let mut json = false;
    let mut verbose = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Value(val) => values.push_back(val.string()?),
            Long("bgr") => overrides.bgr = true,
            Short('c') | Long("config") => config = Some(parser.value()?.string()?),
            Long("crop") => overrides.crop = Some(parser.value()?.parse_with(parse_array)?),
            Short('d') | Long("dims") => {
                overrides.dims = Some(parser.value()?.parse_with(parse_array)?)
            }
            Long("imagenet") => overrides.imagenet = true,
            Long("json") => json = true,
            Long("mean") => overrides.mean = Some(parser.value()?.parse_with(parse_list)?),
            Long("nchw") => overrides.layout = Some(TensorLayout::Nchw),
            Long("nhwc") => overrides.layout = Some(TensorLayout::Nhwc),
            Long("norm") => overrides.norm = true,
            Short('o') | Long("output") => output = Some(parser.value()?.string()?),
            Long("scaled") => overrides.scaled = true,
            Long("std") => overrides.std = Some(parser.value()?.parse_with(parse_list)?),
            Short('v') | Long("verbose") => verbose = true,
            Short('h') | Long("help") => {
                println!(
                    "Prepare model inputs and inspect model outputs.

Usage:
  {bin_name} image [OPTIONS] <image>
  {bin_name} npy <file>
  {bin_name} classify [--json] <scores.npy> <labels.txt>

Files can be local paths or http(s) URLs.

Image options:

  -c, --config <file>   Read input options from a JSON file
  -d, --dims <n,c,h,w>  Input dimensions. Default is 1,3,224,224.
  --mean <a,b,c,...>    Per-channel mean
  --std <a,b,c,...>     Per-channel standard deviation
  --norm                Scale pixel values to [0, 1] before normalizing
  --imagenet            Use ImageNet normalization (implies --norm)
  --bgr                 Use BGR channel order
  --nchw, --nhwc        Tensor layout. Default is NCHW.
  --scaled              Shrink image to fit, preserving aspect ratio
  --crop <sx,sy,sw,sh,dw,dh>
                        Draw a region of the image
  -o, --output <file>   Save tensor, with batch dimension, as a .npy file

Other options:

  --json                Print classification results as JSON
  -v, --verbose         Log timings to stderr. Also enabled by NNPREP_VERBOSE=1.
  -h, --help            Print help
",
                    bin_name = parser.bin_name().unwrap_or("nnprep")
                );
                std::process::exit(0);
            }
            _ => return Err(arg.unexpected()),
        }
    }

    let command_name = values.pop_front().ok_or("missing `<command>` arg")?;
    let command = match command_name.as_str() {
        "image" => Command::Image {
            image: values.pop_front().ok_or("missing `<image>` arg")?,
            config,
            overrides,
            output,
        },
        "npy" => Command::Npy {
            url: values.pop_front().ok_or("missing `<file>` arg")?,
        },
        "classify" => Command::Classify {
            scores: values.pop_front().ok_or("missing `<scores.npy>` arg")?,
            labels: values.pop_front().ok_or("missing `<labels.txt>` arg")?,
            json,
        },
        other => return Err(format!("unknown command \"{}\"", other).into()),
    };

    Ok(Args { command, verbose })
}

/// Choose how to load a file or URL.
fn source_for(url: &str) -> Box<dyn ByteSource> {
    if is_remote_url(url) {
        Box::new(HttpSource::new())
    } else {
        Box::new(FileSource::new())
    }
}

fn input_options(
    config: Option<&str>,
    overrides: ImageOverrides,
) -> Result<InputOptions, Box<dyn Error>> {
    let mut options = match config {
        Some(url) => InputOptions::from_json(&fetch_text(source_for(url).as_ref(), url)?)?,
        None => InputOptions::new(overrides.dims.unwrap_or([1, 3, 224, 224])),
    };

    if overrides.imagenet {
        let imagenet = InputOptions::imagenet(options.input_dimensions);
        options.mean = imagenet.mean;
        options.std = imagenet.std;
        options.norm = true;
    }
    if let Some(dims) = overrides.dims {
        options.input_dimensions = dims;
    }
    if overrides.mean.is_some() {
        options.mean = overrides.mean;
    }
    if overrides.std.is_some() {
        options.std = overrides.std;
    }
    if overrides.norm {
        options.norm = true;
    }
    if overrides.bgr {
        options.channel_scheme = ChannelScheme::Bgr;
    }
    if overrides.layout.is_some() {
        options.input_layout = overrides.layout;
    }
    if overrides.scaled {
        options.scaled = true;
    }
    if let Some([sx, sy, s_width, s_height, d_width, d_height]) = overrides.crop {
        options.draw_options = Some(DrawOptions {
            sx,
            sy,
            s_width,
            s_height,
            d_width,
            d_height,
        });
    }

    Ok(options)
}

fn format_values(values: &[f32], max_count: usize) -> String {
    let mut formatted: Vec<String> = values
        .iter()
        .take(max_count)
        .map(|x| format!("{:.4}", x))
        .collect();
    if values.len() > max_count {
        formatted.push("...".to_string());
    }
    format!("[{}]", formatted.join(", "))
}

fn run_image(
    image: &str,
    config: Option<&str>,
    overrides: ImageOverrides,
    output: Option<&str>,
    verbose: bool,
) -> Result<(), Box<dyn Error>> {
    let options = input_options(config, overrides)?;
    if verbose {
        eprintln!("Input options: {}", serde_json::to_string(&options)?);
    }

    let start = Instant::now();
    let img = fetch_image(source_for(image).as_ref(), image)?;
    if verbose {
        eprintln!(
            "Loaded {}x{} image in {:.2}ms",
            img.width(),
            img.height(),
            start.elapsed().as_secs_f64() * 1000.
        );
    }

    let start = Instant::now();
    let tensor = build_input_tensor(&img, &options);
    if verbose {
        eprintln!(
            "Built tensor in {:.2}ms",
            start.elapsed().as_secs_f64() * 1000.
        );
    }

    let len = tensor.len().max(1) as f32;
    let (min, max, sum) = tensor
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY, 0.), |(min, max, sum), &x| {
            (min.min(x), max.max(x), sum + x)
        });
    println!(
        "Tensor shape {:?} layout {:?} min {:.4} max {:.4} mean {:.4}",
        tensor.shape(),
        options.layout(),
        min,
        max,
        sum / len
    );

    if let Some(output) = output {
        let mut shape = vec![1];
        shape.extend(tensor.shape());
        let array = DecodedArray::new(&shape, tensor.into_data().into());
        fs::write(output, encode(&array))?;
        println!("Wrote {}", output);
    }

    Ok(())
}

fn run_npy(url: &str, verbose: bool) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let buf = source_for(url).fetch_bytes(url)?;
    let array = decode(&buf)?;
    if verbose {
        eprintln!(
            "Decoded {} bytes in {:.2}ms",
            buf.len(),
            start.elapsed().as_secs_f64() * 1000.
        );
    }

    let dtype = array.data_type();
    println!("Data type {} ({})", dtype, dtype.tag());
    println!("Shape {:?}", array.shape.as_slice());
    println!("Values {}", format_values(&array.data.to_f32_vec(), 10));

    Ok(())
}

fn run_classify(
    scores: &str,
    labels: &str,
    json: bool,
    verbose: bool,
) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let buf = source_for(scores).fetch_bytes(scores)?;
    let scores = decode(&buf)?.data.to_f32_vec();
    let labels = fetch_labels(source_for(labels).as_ref(), labels)?;
    if verbose {
        eprintln!(
            "Loaded {} scores and {} labels in {:.2}ms",
            scores.len(),
            labels.len(),
            start.elapsed().as_secs_f64() * 1000.
        );
    }

    let start = Instant::now();
    let top = top_classes(&scores, &labels);
    if verbose {
        eprintln!(
            "Ranked scores in {:.2}ms",
            start.elapsed().as_secs_f64() * 1000.
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&top)?);
        return Ok(());
    }

    println!("Top classes:");
    for class in top {
        println!(
            "  {}: {}%",
            class.label.as_deref().unwrap_or("unknown"),
            class.prob
        );
    }

    Ok(())
}

/// Tool for preparing model inputs from images and inspecting `.npy` data
/// and classification outputs.
///
/// ```
/// cargo run -p nnprep-cli -- image --imagenet -o input.npy cat.jpg
/// cargo run -p nnprep-cli -- classify scores.npy labels.txt
/// ```
fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args()?;
    let verbose = args.verbose || verbose_from_env();

    match args.command {
        Command::Image {
            image,
            config,
            overrides,
            output,
        } => run_image(
            &image,
            config.as_deref(),
            overrides,
            output.as_deref(),
            verbose,
        ),
        Command::Npy { url } => run_npy(&url, verbose),
        Command::Classify {
            scores,
            labels,
            json,
        } => run_classify(&scores, &labels, json, verbose),
    }
}
