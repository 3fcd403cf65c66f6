use crate::{
    json_log::{format_timestamp, SampleRecord},
    Error,
};
use chrono::{DateTime, Utc};
use clap::Args;
use ratatui::{
    crossterm::event::{self, Event, KeyCode, KeyEventKind},
    style::{Color, Style},
    symbols::Marker,
    text::Line,
    widgets::{Axis, Block, Chart, Dataset, GraphType, LegendPosition},
    DefaultTerminal, Frame,
};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

/// Plot D4 to D7 pin states from a sample log.
#[derive(Args, Debug)]
pub struct PlotArgs {
    /// Path to the NDJSON sample log
    #[arg(long)]
    pub file: PathBuf,

    /// Only plot the last N seconds
    #[arg(long)]
    pub since: Option<u64>,

    /// Downsample to at most N points
    #[arg(long, default_value_t = 5000)]
    pub max_points: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub values: [Option<u8>; 4],
}

struct Trace {
    label: &'static str,
    offset: f64,
    color: Color,
}

/// Vertical offsets keep the four digital traces from overlapping.
const TRACES: [Trace; 4] = [
    Trace {
        label: "D4",
        offset: 0.0,
        color: Color::Cyan,
    },
    Trace {
        label: "D5",
        offset: 1.5,
        color: Color::Yellow,
    },
    Trace {
        label: "D6",
        offset: 3.0,
        color: Color::Magenta,
    },
    Trace {
        label: "D7",
        offset: 4.5,
        color: Color::Green,
    },
];

const Y_MAX: f64 = 6.0;

/// Spacing of y axis labels, every trace level falls on a multiple of it.
const Y_LABEL_STEP: f64 = 0.5;

/// Evenly spaced y axis labels from `0` to [`Y_MAX`], naming each trace's low
/// and high level and blank elsewhere.
fn y_labels() -> Vec<String> {
    let steps = (Y_MAX / Y_LABEL_STEP).round() as usize;

    (0..=steps)
        .map(|i| {
            let y = i as f64 * Y_LABEL_STEP;
            TRACES
                .iter()
                .find_map(|t| {
                    [0u8, 1].into_iter().find_map(|v| {
                        ((t.offset + f64::from(v) - y).abs() < 1e-9)
                            .then(|| format!("{}={v}", t.label))
                    })
                })
                .unwrap_or_default()
        })
        .collect()
}

/// Reads a sample log, skipping lines that are not valid records.
///
/// With `since` set, samples older than `now - since` are dropped.
pub fn read_ndjson(
    path: &Path,
    since: Option<Duration>,
    now: DateTime<Utc>,
) -> Result<Vec<Sample>, Error> {
    let cutoff = since
        .and_then(|since| chrono::Duration::from_std(since).ok())
        .and_then(|since| now.checked_sub_signed(since));

    let reader = BufReader::new(File::open(path)?);
    let mut samples = Vec::new();
    let mut malformed = 0usize;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(sample) = parse_record(line) else {
            malformed += 1;
            continue;
        };

        if cutoff.is_some_and(|cutoff| sample.time < cutoff) {
            continue;
        }
        samples.push(sample);
    }

    if malformed > 0 {
        debug!("Skipped {malformed} malformed lines in {}", path.display());
    }

    samples.sort_by_key(|s| s.time);
    Ok(samples)
}

fn parse_record(line: &str) -> Option<Sample> {
    let record: SampleRecord = serde_json::from_str(line).ok()?;
    Some(Sample {
        time: record.time().ok()?,
        values: record.values(),
    })
}

/// Keeps at most `max_points` evenly spaced samples, always including the last one.
pub fn downsample(samples: Vec<Sample>, max_points: usize) -> Vec<Sample> {
    let n = samples.len();
    if max_points == 0 || n <= max_points {
        return samples;
    }

    let step = n as f64 / max_points as f64;
    let mut indices: Vec<usize> = (0..max_points).map(|i| (i as f64 * step) as usize).collect();
    if let Some(last) = indices.last_mut() {
        *last = n - 1;
    }

    indices.into_iter().map(|i| samples[i].clone()).collect()
}

/// Step shaped `(seconds since first sample, value + offset)` points for one pin.
pub fn step_series(samples: &[Sample], pin_index: usize, offset: f64) -> Vec<(f64, f64)> {
    let Some(t0) = samples.first().map(|s| s.time) else {
        return Vec::new();
    };

    let mut points = Vec::new();
    let mut previous: Option<f64> = None;

    for sample in samples {
        let Some(value) = sample.values.get(pin_index).copied().flatten() else {
            continue;
        };

        let x = (sample.time - t0).num_milliseconds() as f64 / 1000.0;
        let y = f64::from(value) + offset;

        if let Some(previous) = previous {
            points.push((x, previous));
        }
        points.push((x, y));
        previous = Some(y);
    }

    points
}

pub fn run(args: &PlotArgs) -> Result<(), Error> {
    let samples = read_ndjson(&args.file, args.since.map(Duration::from_secs), Utc::now())?;
    let samples = downsample(samples, args.max_points);

    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        println!("No samples to plot.");
        return Ok(());
    };

    let title = format!(
        "Pin States (UTC)  {}  →  {}",
        format_timestamp(&first.time),
        format_timestamp(&last.time)
    );
    let span = ((last.time - first.time).num_milliseconds() as f64 / 1000.0).max(1.0);
    let x_labels = [first.time, first.time + (last.time - first.time) / 2, last.time]
        .map(|t| t.format("%H:%M:%S").to_string());

    let series: Vec<Vec<(f64, f64)>> = TRACES
        .iter()
        .enumerate()
        .map(|(i, trace)| step_series(&samples, i, trace.offset))
        .collect();

    let chart = ChartView {
        title,
        span,
        x_labels,
        series,
    };

    let mut terminal = ratatui::init();
    let result = chart.show(&mut terminal);
    ratatui::restore();

    Ok(result?)
}

struct ChartView {
    title: String,
    span: f64,
    x_labels: [String; 3],
    series: Vec<Vec<(f64, f64)>>,
}

impl ChartView {
    fn show(&self, terminal: &mut DefaultTerminal) -> std::io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press
                        && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                    {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn render(&self, frame: &mut Frame) {
        let datasets = TRACES
            .iter()
            .zip(&self.series)
            .filter(|(_, points)| !points.is_empty())
            .map(|(trace, points)| {
                Dataset::default()
                    .name(trace.label)
                    .marker(Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(trace.color))
                    .data(points)
            })
            .collect::<Vec<_>>();

        let y_labels = y_labels().into_iter().map(Line::from);

        let chart = Chart::new(datasets)
            .block(Block::bordered().title(self.title.as_str()))
            .x_axis(
                Axis::default()
                    .title("Time (UTC)")
                    .bounds([0.0, self.span])
                    .labels(self.x_labels.iter().map(|l| Line::from(l.as_str()))),
            )
            .y_axis(Axis::default().bounds([0.0, Y_MAX]).labels(y_labels))
            .legend_position(Some(LegendPosition::TopRight));

        frame.render_widget(chart, frame.area());
    }
}
