use std::error::Error as StdError;
use std::path::PathBuf;

use log::info;
use plotters::prelude::*;
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::histogram::{HistError, Hist1D};

const AZURE: RGBColor = RGBColor(153, 204, 255);

const EXPERIMENT_LABEL: &str = "CMS Open Data";
const RUN_LABEL: &str = "√s = 8 TeV, L_int = 11.6 fb⁻¹";

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Failed to draw {0:?}: {1}")]
    Draw(PathBuf, String),
    #[error("Histograms cannot be combined: {0}")]
    HistErr(#[from] HistError),
}

/// Four-lepton mass plot with signal, background and data
#[derive(Clone, Debug, TypedBuilder)]
pub struct Plotter {
    #[builder(setter(into))]
    filename: PathBuf,
    #[builder(setter(into))]
    x_label: String,
    #[builder(default = 800)]
    width: u32,
    #[builder(default = 700)]
    height: u32,
    /// Upper limit of the y axis
    #[builder(default = 18.)]
    y_max: f64,
}

impl Plotter {
    /// Draw signal stacked on background, overlaid with data
    pub fn plot(
        &self,
        signal: &Hist1D,
        background: &Hist1D,
        data: &Hist1D,
    ) -> Result<(), PlotError> {
        let mut stack = signal.clone();
        stack.add(background)?;
        stack.check_compatible(data)?;
        self.draw(&stack, background, data).map_err(|err| {
            PlotError::Draw(self.filename.clone(), err.to_string())
        })?;
        info!("Written plot to {:?}", self.filename);
        Ok(())
    }

    fn draw(
        &self,
        stack: &Hist1D,
        background: &Hist1D,
        data: &Hist1D,
    ) -> Result<(), Box<dyn StdError>> {
        let y_max = self.y_max;
        let root = SVGBackend::new(&self.filename, (self.width, self.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .margin_top(50)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(stack.low()..stack.high(), 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(self.x_label.as_str())
            .y_desc("N_Events")
            .draw()?;

        chart
            .draw_series(background.bins().map(|(low, high, content, _)| {
                Rectangle::new([(low, 0.), (high, content.min(y_max))], AZURE.filled())
            }))?
            .label("ZZ")
            .legend(|(x, y)| {
                Rectangle::new([(x, y - 5), (x + 20, y + 5)], AZURE.filled())
            });
        chart.draw_series(std::iter::once(PathElement::new(
            step_outline(background, y_max),
            BLACK,
        )))?;

        chart
            .draw_series(LineSeries::new(
                step_outline(stack, y_max),
                RED.stroke_width(2),
            ))?
            .label("m_H = 125 GeV")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

        let points: Vec<_> = data
            .bins()
            .filter(|(_, _, content, _)| *content > 0.)
            .map(|(low, high, content, error)| (0.5 * (low + high), content, error))
            .collect();
        chart.draw_series(points.iter().map(|&(x, y, err)| {
            ErrorBar::new_vertical(x, y - err, y, (y + err).min(y_max), BLACK.filled(), 0)
        }))?;
        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, y, _)| Circle::new((x, y), 3, BLACK.filled())),
            )?
            .label("Data")
            .legend(|(x, y)| Circle::new((x + 10, y), 3, BLACK.filled()));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.draw(&Text::new(EXPERIMENT_LABEL, (80, 20), ("sans-serif", 22)))?;
        let run_label_x = self.width.saturating_sub(300) as i32;
        root.draw(&Text::new(RUN_LABEL, (run_label_x, 20), ("sans-serif", 18)))?;

        root.present()?;
        Ok(())
    }
}

/// Outline of a histogram as a step line, clipped at `y_max`
fn step_outline(hist: &Hist1D, y_max: f64) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(2 * hist.nbins() + 2);
    points.push((hist.low(), 0.));
    for (low, high, content, _) in hist.bins() {
        let y = content.min(y_max);
        points.push((low, y));
        points.push((high, y));
    }
    points.push((hist.high(), 0.));
    points
}
