mod opt;

use std::fs::create_dir_all;
use std::time::Instant;

use crate::opt::Opt;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use hzz4l::{
    analysis::{ResultHandle, SampleId},
    config::{Config, Samples, WeightedSample},
    prelude::*,
    GIT_BRANCH, GIT_REV, VERSION,
};
use log::{debug, info};

/// Results booked for one channel
struct ChannelResults {
    channel: Channel,
    signal: ResultHandle,
    background: ResultHandle,
    data: ResultHandle,
}

fn main() -> Result<()> {
    let args = argfile::expand_args_from(
        std::env::args_os(),
        argfile::parse_fromfile,
        argfile::PREFIX,
    )
    .with_context(|| "Failed to read argument file")?;
    let opt = Opt::parse_from(args);
    let env = Env::default().filter_or("HZZ4L_LOG", &opt.loglevel);
    env_logger::init_from_env(env);

    rayon::ThreadPoolBuilder::new()
        .num_threads(opt.threads)
        .build_global()?;

    if let (Some(rev), Some(branch)) = (GIT_REV, GIT_BRANCH) {
        info!("hzz4l {VERSION} rev {rev} ({branch})");
    } else {
        info!("hzz4l {VERSION}");
    }

    debug!("settings: {:#?}", opt);
    let config = opt.config()?;
    debug!("configuration: {:#?}", config);

    let settings = AnalysisSettingsBuilder::default()
        .chunk_size(opt.chunk_size)
        .tree(config.tree.as_str())
        .progress(!opt.no_progress)
        .build()?;
    let mut analysis = Analysis::new(settings);

    let Samples {
        signal,
        background_4mu,
        background_4el,
        data_4mu,
        data_4el,
    } = config.samples();
    let signal_weight = signal.weight.value();
    let signal = analysis.add_sample(signal.sample);
    let channels = [
        (Channel::FourMuon, background_4mu, data_4mu),
        (Channel::FourElectron, background_4el, data_4el),
    ];
    let mut booked = Vec::with_capacity(channels.len());
    for (channel, background, data) in channels {
        booked.push(book_channel(
            &mut analysis,
            &config,
            channel,
            (signal, signal_weight),
            background,
            data,
        )?);
    }

    // trigger the event loops
    let mut timings = Vec::new();
    for res in &booked {
        for handle in [res.signal, res.background, res.data] {
            let start = Instant::now();
            analysis.get_value(handle)?;
            let label = analysis.label(handle).unwrap_or_default().to_owned();
            timings.push((label, start.elapsed()));
        }
    }
    for (label, elapsed) in timings {
        println!("Event loop {label}: {:.2} s", elapsed.as_secs_f64());
    }
    info!("{} passes over samples", analysis.passes());

    create_dir_all(&config.outdir).with_context(|| {
        format!("Failed to create output directory {:?}", config.outdir)
    })?;
    for res in booked {
        let filename = config.outdir.join(format!("higgs_{}.svg", res.channel));
        let plotter = Plotter::builder()
            .filename(filename)
            .x_label(res.channel.mass_label())
            .build();
        let signal = analysis.get_value(res.signal)?.histogram.clone();
        let background = analysis.get_value(res.background)?.histogram.clone();
        let data = &analysis.get_value(res.data)?.histogram;
        plotter
            .plot(&signal, &background, data)
            .with_context(|| format!("Failed to plot {} channel", res.channel))?;
    }

    info!("done");
    Ok(())
}

fn book_channel(
    analysis: &mut Analysis,
    config: &Config,
    channel: Channel,
    (signal, signal_weight): (SampleId, f64),
    background: WeightedSample,
    data: WeightedSample,
) -> Result<ChannelResults> {
    let background_weight = background.weight.value();
    let data_weight = data.weight.value();
    let background_sample = analysis.add_sample(background.sample);
    let data_sample = analysis.add_sample(data.sample);
    let mut book = |kind: &str, sample: SampleId, weight: f64| {
        let label = format!("{kind}_{channel}");
        let spec = config.binning.spec(&format!("h_{label}"));
        analysis.book(label, sample, channel, spec, weight)
    };
    Ok(ChannelResults {
        channel,
        signal: book("sig", signal, signal_weight)?,
        background: book("bkg", background_sample, background_weight)?,
        data: book("data", data_sample, data_weight)?,
    })
}
