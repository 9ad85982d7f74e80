use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use stream_mixer_core::{
    AppConfig, CueSheet, Mixer, OfflineDevice, Recorder, RecordingSettings, Session, Source,
    SourceBank, SourceLoader, WavLoader,
};
use tracing_subscriber::EnvFilter;

fn main() -> stream_mixer_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Render { cue, output } => run_render(&config, &cue, &output),
        Commands::Tone {
            output,
            frequency,
            seconds,
            amplitude,
        } => run_tone(&config, &output, frequency, seconds, amplitude),
        Commands::Info { input } => run_info(&config, &input),
    }
}

fn run_render(config: &AppConfig, cue: &Path, output: &Path) -> stream_mixer_core::Result<()> {
    tracing::info!(?cue, ?output, "rendering cue sheet");

    let sheet = CueSheet::from_path(cue)?;
    let base = cue.parent().unwrap_or_else(|| Path::new("."));
    let loader = WavLoader::new(config.mixer.sample_rate);

    // Source paths in the sheet are relative to the sheet itself.
    let resolved: Vec<(String, String)> = sheet
        .sources
        .iter()
        .map(|(name, path)| (name.clone(), base.join(path).to_string_lossy().into_owned()))
        .collect();
    let mut bank = SourceBank::new();
    bank.load_all(
        &loader,
        resolved.iter().map(|(name, path)| (name.as_str(), path.as_str())),
    )?;

    let mixer = Mixer::new(&config.mixer)?;
    let mut session = Session::prepare(&sheet, &bank, mixer)?;
    let mut device = OfflineDevice::new(config.mixer.device_buffer_frames);
    let mut recorder = Recorder::create(RecordingSettings::new(output, config.mixer.sample_rate))?;

    session.run(&mut device, |period| recorder.write(period))?;
    let seconds = recorder.finalize()?;
    println!("wrote {seconds:.2} s to {}", output.display());
    Ok(())
}

fn run_tone(
    config: &AppConfig,
    output: &Path,
    frequency: f32,
    seconds: f32,
    amplitude: f32,
) -> stream_mixer_core::Result<()> {
    tracing::info!(frequency, seconds, amplitude, ?output, "writing test tone");

    let sample_rate = config.mixer.sample_rate;
    let tone = Source::sine(frequency, seconds, amplitude, sample_rate);
    let mut recorder = Recorder::create(RecordingSettings::new(output, sample_rate))?;
    recorder.write(tone.samples())?;
    recorder.finalize()?;
    Ok(())
}

fn run_info(config: &AppConfig, input: &Path) -> stream_mixer_core::Result<()> {
    let sample_rate = config.mixer.sample_rate;
    let source = WavLoader::new(sample_rate).load(&input.to_string_lossy())?;
    println!("{}", input.display());
    println!("  sample rate: {sample_rate} Hz");
    println!("  frames:      {}", source.frames());
    println!("  duration:    {:.2} s", source.duration_seconds(sample_rate));
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Fixed-pool PCM stream mixer", long_about = None)]
struct Cli {
    /// Optional JSON configuration overriding the engine defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mix the voices of a cue sheet offline and record the result.
    Render {
        /// JSON cue sheet describing sources, voices and timed actions.
        #[arg(long)]
        cue: PathBuf,
        /// Output WAV path.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write a stereo sine tone in the engine format.
    Tone {
        /// Output WAV path.
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 440.0)]
        frequency: f32,
        #[arg(long, default_value_t = 2.0)]
        seconds: f32,
        #[arg(long, default_value_t = 0.5)]
        amplitude: f32,
    },
    /// Validate a WAV file against the engine format and print its length.
    Info {
        input: PathBuf,
    },
}
