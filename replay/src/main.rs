#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod feed;

use std::io::{BufWriter, Write};
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDateTime;
use crossbeam_channel::RecvTimeoutError;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use playback::{Batch, Config, FetchPlanner, HourSystem, Scene, VirtualClock};

use self::feed::{Answer, Feed};

#[derive(StructOpt)]
#[structopt(about = "Replays recorded tracklets, writing a GeoJSON FeatureCollection per frame")]
struct Args {
    /// The path to a JSON array of tracklet records. Repeat to play several recordings together.
    #[structopt(long, required = true)]
    batch: Vec<String>,
    /// The path to a JSON config file. Anything it leaves out keeps the default.
    #[structopt(long)]
    config: Option<String>,
    /// Overrides the config's loop length
    #[structopt(long)]
    loop_length: Option<f64>,
    /// Overrides the config's animation speed
    #[structopt(long)]
    animation_speed: Option<f64>,
    /// Frames per second of clock time
    #[structopt(long, default_value = "30")]
    fps: f64,
    /// How many frames to produce
    #[structopt(long, default_value = "300")]
    ticks: usize,
    /// Start the clock here, like "2022-03-01 18:30:00" (UTC). Defaults to the earliest tracklet.
    #[structopt(long)]
    start: Option<String>,
    /// Pretend the map is at this zoom level
    #[structopt(long)]
    zoom: Option<f64>,
    /// Actually wait between frames, and let the feed answer whenever it's ready
    #[structopt(long)]
    realtime: bool,
    /// Log the time in 24-hour format
    #[structopt(long = "24h")]
    twenty_four_hour: bool,
    /// Write frames here instead of STDOUT
    #[structopt(long)]
    output: Option<String>,
    /// Log debug output
    #[structopt(long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> Result<Config> {
        let mut config = match self.config {
            Some(ref path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(x) = self.loop_length {
            config.loop_length = x;
        }
        if let Some(x) = self.animation_speed {
            config.animation_speed = x;
        }
        Ok(config)
    }

    fn clock(&self, recording: &Batch) -> Result<VirtualClock> {
        let mut clock = if let Some(ref start) = self.start {
            let date = NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M:%S")
                .map_err(|err| anyhow!("bad --start {start}: {err}"))?;
            VirtualClock::new(date)
        } else if let Some(time) = recording.start_time() {
            VirtualClock::from_timestamp_ms(time)
                .ok_or_else(|| anyhow!("the recording starts at a strange time, {time}"))?
        } else {
            warn!("The recording is empty; starting from the current time");
            VirtualClock::now()
        };
        if self.twenty_four_hour {
            clock.set_hour_system(HourSystem::TwentyFour);
        }
        Ok(clock)
    }

    fn output(&self) -> Result<Box<dyn Write>> {
        Ok(match self.output {
            Some(ref path) => Box::new(BufWriter::new(fs_err::File::create(path)?)),
            None => Box::new(BufWriter::new(std::io::stdout())),
        })
    }
}

fn main() -> Result<()> {
    let args = Args::from_args();
    setup_logging(args.verbose);

    if args.fps <= 0.0 || !args.fps.is_finite() {
        bail!("--fps must be positive, not {}", args.fps);
    }
    let config = args.config()?;
    let mut batches = Vec::new();
    for path in &args.batch {
        batches.push(Batch::load(path)?);
    }
    let recording = Batch::merge(batches);
    let clock = args.clock(&recording)?;
    let mut scene = Scene::new(&config, clock)?;
    if let Some(zoom) = args.zoom {
        scene.set_zoom(zoom);
    }
    info!(
        "Replaying {} objects from {} {}",
        recording.len(),
        scene.clock.date_string(),
        scene.clock.time_string()
    );

    let feed = Feed::spawn(recording);
    let mut planner = FetchPlanner::new(config.fetch.clone());
    let mut out = args.output()?;
    let elapsed_ms = 1000.0 / args.fps;
    let patience = Duration::from_secs_f64(config.fetch.pending_timeout_ms.max(0.0) / 1000.0);

    for tick in 0..args.ticks {
        if let Some(query) = planner.poll(scene.clock.timestamp_ms(), elapsed_ms) {
            feed.request(query)?;
        }

        let answers: Vec<Answer> = if args.realtime {
            feed.answers.try_iter().collect()
        } else if planner.is_waiting() {
            // Without a real clock, there's no point in drawing frames before the answer is in
            match feed.answers.recv_timeout(patience) {
                Ok(answer) => vec![answer],
                Err(RecvTimeoutError::Timeout) => Vec::new(),
                Err(RecvTimeoutError::Disconnected) => bail!("the feed thread is gone"),
            }
        } else {
            Vec::new()
        };
        if apply_answers(&mut planner, &mut scene, answers) > 0 {
            debug!("Tick {tick}: {} objects", scene.num_objects());
        }

        let frame = scene.tick(elapsed_ms);
        writeln!(out, "{}", frame.to_geojson())?;

        if tick % (args.fps.ceil() as usize).max(1) == 0 {
            info!(
                "{} {}: {} of {} objects visible",
                scene.clock.date_string(),
                scene.clock.time_string(),
                frame.features.len(),
                scene.num_objects()
            );
        }
        if args.realtime {
            std::thread::sleep(Duration::from_secs_f64(elapsed_ms / 1000.0));
        }
    }

    out.flush()?;
    feed.shutdown()?;
    info!(
        "Done after {} frames, ending at {} {}",
        args.ticks,
        scene.clock.date_string(),
        scene.clock.time_string()
    );
    Ok(())
}

/// Only answers to the query the planner is still waiting on reach the scene. Returns how many did.
fn apply_answers(planner: &mut FetchPlanner, scene: &mut Scene, answers: Vec<Answer>) -> usize {
    let mut applied = 0;
    for answer in answers {
        if planner.on_batch(&answer.query) {
            scene.apply_batch(&answer.batch);
            applied += 1;
        } else {
            warn!(
                "Dropping a late answer for the window at {}",
                answer.query.timestamp
            );
        }
    }
    applied
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Logs go to STDERR, since frames might be going to STDOUT
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
