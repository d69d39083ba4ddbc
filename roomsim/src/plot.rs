//! Plotting of impulse responses.
//!
//! Compares the responses of the simple and enhanced reflection models for
//! the first source–receiver pair of a room, one plot per band.

use crate::error::Result;
use crate::impulse::ImpulseResponse;
use crate::room::Band;
use crate::simulate::ImpulseResponses;
use build_html::*;
use plotly::common::{DashType, Line, Mode, Title};
use plotly::layout::Axis;
use plotly::{Layout, Plot, Scatter};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Samples kept after the last arrival of the plotted responses
const TAIL_SAMPLES: usize = 200;

/// Number of samples worth plotting: up to the last arrival plus a short tail
fn plotted_length(responses: &[&ImpulseResponse]) -> usize {
    let len = responses.iter().map(|ir| ir.len()).min().unwrap_or(0);
    let last = responses
        .iter()
        .filter_map(|ir| ir.samples().iter().rposition(|v| *v != 0.0))
        .max()
        .unwrap_or(0);
    (last + TAIL_SAMPLES).min(len)
}

/// Original (dashed) against extended (solid) response
pub fn plot_comparison(
    original: &ImpulseResponse,
    extended: &ImpulseResponse,
    title: &str,
) -> Plot {
    let n = plotted_length(&[original, extended]);
    let x: Vec<usize> = (0..n).collect();

    let mut plot = Plot::new();

    let head = |ir: &ImpulseResponse| ir.samples().iter().take(n).copied().collect::<Vec<f64>>();

    let original_trace = Scatter::new(x.clone(), head(original))
        .mode(Mode::Lines)
        .name("Original Response")
        .line(Line::new().dash(DashType::Dash).width(1.5));
    plot.add_trace(original_trace);

    let extended_trace = Scatter::new(x, head(extended))
        .mode(Mode::Lines)
        .name("Extended Response")
        .line(Line::new().width(1.5));
    plot.add_trace(extended_trace);

    let heading = format!(
        "Comparison of Original and Extended Impulse Responses - {}",
        title
    );
    let layout = Layout::new()
        .title(Title::with_text(&heading))
        .width(1000)
        .height(500)
        .x_axis(Axis::new().title(Title::with_text("Time (samples)")))
        .y_axis(Axis::new().title(Title::with_text("Amplitude")));
    plot.set_layout(layout);

    plot
}

/// One comparison plot per band, first source–receiver pair only
pub fn plot_room(
    name: &str,
    original: &ImpulseResponses,
    extended: &ImpulseResponses,
) -> Vec<(Option<Band>, Plot)> {
    original
        .groups()
        .into_iter()
        .zip(extended.groups())
        .filter_map(|((band, a), (_, b))| {
            let (a, b) = (a.first()?, b.first()?);
            let title = match band {
                Some(band) => format!("{} ({})", name, band),
                None => name.to_string(),
            };
            Some((band, plot_comparison(a, b, &title)))
        })
        .collect()
}

/// HTML page embedding every plot of a room
pub fn room_html(name: &str, plots: &[(Option<Band>, Plot)]) -> String {
    plots
        .iter()
        .enumerate()
        .fold(
            HtmlPage::new()
                .with_title(format!("Impulse responses - {}", name))
                .with_script_link("https://cdn.plot.ly/plotly-3.2.0.min.js"),
            |page, (idx, (band, plot))| {
                let div = match band {
                    Some(band) => format!("ir-{}", band),
                    None => format!("ir-{}", idx),
                };
                page.with_raw(plot.to_inline_html(Some(div.as_str())))
            },
        )
        .to_html_string()
}

/// Write the comparison plots of a room to an HTML file
pub fn save_room_plots(
    name: &str,
    original: &ImpulseResponses,
    extended: &ImpulseResponses,
    output_path: &Path,
) -> Result<()> {
    let html = room_html(name, &plot_room(name, original, extended));

    // Ensure parent directory exists before writing files
    let html_output_path = output_path.with_extension("html");
    if let Some(parent) = html_output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(&html_output_path)?;
    file.write_all(html.as_bytes())?;
    file.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impulse::Arrival;

    fn response(arrivals: &[(usize, f64)]) -> ImpulseResponse {
        let mut ir = ImpulseResponse::new(1000);
        for &(index, distance) in arrivals {
            ir.deposit(&Arrival { index, distance }, 1.0);
        }
        ir
    }

    #[test]
    fn test_plotted_length() {
        let a = response(&[(10, 1.0), (300, 2.0)]);
        let b = response(&[(10, 1.0)]);
        assert_eq!(plotted_length(&[&a, &b]), 500);

        // never longer than the window
        let c = response(&[(1400, 2.0)]);
        assert_eq!(plotted_length(&[&c]), 1500);
    }

    #[test]
    fn test_room_html() {
        let a = ImpulseResponses::Single(vec![response(&[(10, 1.0), (40, 2.0)])]);
        let b = ImpulseResponses::Single(vec![response(&[(10, 1.0), (40, 4.0)])]);
        let plots = plot_room("small_room", &a, &b);
        assert_eq!(plots.len(), 1);

        let html = room_html("small_room", &plots);
        assert!(html.contains("Original Response"));
        assert!(html.contains("Extended Response"));
        assert!(html.contains("small_room"));
    }

    #[test]
    fn test_empty_responses_have_no_plot() {
        let a = ImpulseResponses::Single(vec![]);
        let b = ImpulseResponses::Single(vec![]);
        assert!(plot_room("empty", &a, &b).is_empty());
    }
}
