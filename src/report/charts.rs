//! Chart artifact rendering
//!
//! Charts are emitted as self-contained SVG documents. Consumers treat the
//! bytes as opaque; only the artifact name is part of the contract.

use std::collections::BTreeSet;

/// A named, opaque binary artifact handed to the emitter
#[derive(Debug, Clone)]
pub struct ChartArtifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ChartArtifact {
    fn svg(name: impl Into<String>, body: String) -> Self {
        Self {
            name: name.into(),
            bytes: body.into_bytes(),
        }
    }
}

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 400.0;
const MARGIN: f64 = 48.0;
const REF_COLOR: &str = "#4878cf";
const NEW_COLOR: &str = "#d65f5f";

/// Grouped bar chart of normalized category frequencies, reference vs new.
pub fn frequency_chart(
    feature: &str,
    ref_freqs: &[(String, f64)],
    new_freqs: &[(String, f64)],
    drift_detected: bool,
) -> ChartArtifact {
    let categories: BTreeSet<&str> = ref_freqs
        .iter()
        .chain(new_freqs.iter())
        .map(|(c, _)| c.as_str())
        .collect();
    let categories: Vec<&str> = categories.into_iter().collect();

    let max_freq = ref_freqs
        .iter()
        .chain(new_freqs.iter())
        .map(|(_, f)| *f)
        .fold(0.0, f64::max)
        .max(1e-9);

    let mut svg = svg_open();
    svg.push_str(&title(&format!(
        "{feature}: drift detected: {drift_detected}"
    )));
    svg.push_str(&legend());

    let plot_w = WIDTH - 2.0 * MARGIN;
    let plot_h = HEIGHT - 2.0 * MARGIN;
    let group_w = plot_w / categories.len().max(1) as f64;
    let bar_w = (group_w * 0.35).min(48.0);

    for (i, category) in categories.iter().enumerate() {
        let freq_of = |freqs: &[(String, f64)]| {
            freqs
                .iter()
                .find(|(c, _)| c == category)
                .map(|(_, f)| *f)
                .unwrap_or(0.0)
        };
        let x0 = MARGIN + i as f64 * group_w + group_w / 2.0;

        for (offset, freq, color) in [
            (-bar_w, freq_of(ref_freqs), REF_COLOR),
            (0.0, freq_of(new_freqs), NEW_COLOR),
        ] {
            let bar_h = plot_h * freq / max_freq;
            svg.push_str(&format!(
                "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{}\"/>\n",
                x0 + offset,
                MARGIN + plot_h - bar_h,
                bar_w,
                bar_h,
                color
            ));
        }

        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\" text-anchor=\"middle\">{}</text>\n",
            x0,
            HEIGHT - MARGIN + 16.0,
            escape_text(category)
        ));
    }

    svg.push_str(&axis());
    svg.push_str("</svg>\n");
    ChartArtifact::svg(format!("{feature}_frequency.svg"), svg)
}

/// Kernel density curves of the reference and new samples.
pub fn density_chart(
    feature: &str,
    ref_values: &[f64],
    new_values: &[f64],
    drift_detected: bool,
) -> ChartArtifact {
    let mut svg = svg_open();
    svg.push_str(&title(&format!("{feature}: drift: {drift_detected}")));
    svg.push_str(&legend());

    let all_min = ref_values
        .iter()
        .chain(new_values.iter())
        .copied()
        .fold(f64::INFINITY, f64::min);
    let all_max = ref_values
        .iter()
        .chain(new_values.iter())
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    if all_min.is_finite() && all_max.is_finite() {
        let span = (all_max - all_min).max(1e-9);
        let grid_min = all_min - 0.1 * span;
        let grid_max = all_max + 0.1 * span;

        let ref_density = kde_curve(ref_values, grid_min, grid_max);
        let new_density = kde_curve(new_values, grid_min, grid_max);
        let peak = ref_density
            .iter()
            .chain(new_density.iter())
            .copied()
            .fold(0.0, f64::max)
            .max(1e-12);

        for (density, color) in [(&ref_density, REF_COLOR), (&new_density, NEW_COLOR)] {
            svg.push_str(&polyline(density, peak, color));
        }
    }

    svg.push_str(&axis());
    svg.push_str("</svg>\n");
    ChartArtifact::svg(format!("{feature}_density.svg"), svg)
}

/// One-cell-per-feature heatmap of p-values: red below the threshold, blue
/// above, gray where the test was undetermined.
pub fn p_value_heatmap(entries: &[(String, Option<f64>)], threshold: f64) -> ChartArtifact {
    let cell_h = 28.0;
    let height = 72.0 + cell_h * entries.len() as f64;
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{height}\" \
         viewBox=\"0 0 {WIDTH} {height}\">\n\
         <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n"
    );
    svg.push_str(&title("P vals summary"));

    for (i, (feature, p_value)) in entries.iter().enumerate() {
        let y = 48.0 + i as f64 * cell_h;
        let (fill, label) = match p_value {
            Some(p) if *p < threshold => ("#d65f5f", format!("{p:.3}")),
            Some(p) => ("#4878cf", format!("{p:.3}")),
            None => ("#9e9e9e", "n/a".to_string()),
        };
        svg.push_str(&format!(
            "<rect x=\"180\" y=\"{:.1}\" width=\"280\" height=\"{:.1}\" fill=\"{}\" stroke=\"white\"/>\n",
            y,
            cell_h,
            fill
        ));
        svg.push_str(&format!(
            "<text x=\"170\" y=\"{:.1}\" font-size=\"12\" text-anchor=\"end\">{}</text>\n",
            y + cell_h / 2.0 + 4.0,
            escape_text(feature)
        ));
        svg.push_str(&format!(
            "<text x=\"320\" y=\"{:.1}\" font-size=\"12\" text-anchor=\"middle\" fill=\"white\">{}</text>\n",
            y + cell_h / 2.0 + 4.0,
            label
        ));
    }

    svg.push_str("</svg>\n");
    ChartArtifact::svg("pvalues_summary.svg", svg)
}

/// Gaussian KDE with Silverman bandwidth, evaluated on a fixed grid.
fn kde_curve(values: &[f64], grid_min: f64, grid_max: f64) -> Vec<f64> {
    const GRID: usize = 200;
    if values.is_empty() {
        return vec![0.0; GRID];
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    let bandwidth = if std > 0.0 {
        1.06 * std * n.powf(-0.2)
    } else {
        (grid_max - grid_min) / 100.0
    };

    let step = (grid_max - grid_min) / (GRID - 1) as f64;
    (0..GRID)
        .map(|i| {
            let x = grid_min + i as f64 * step;
            values
                .iter()
                .map(|v| {
                    let z = (x - v) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt())
        })
        .collect()
}

fn polyline(density: &[f64], peak: f64, color: &str) -> String {
    let plot_w = WIDTH - 2.0 * MARGIN;
    let plot_h = HEIGHT - 2.0 * MARGIN;
    let points: Vec<String> = density
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let x = MARGIN + plot_w * i as f64 / (density.len() - 1) as f64;
            let y = MARGIN + plot_h * (1.0 - d / peak);
            format!("{x:.1},{y:.1}")
        })
        .collect();
    format!(
        "<polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\" opacity=\"0.85\"/>\n",
        points.join(" "),
        color
    )
}

fn svg_open() -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{HEIGHT}\" \
         viewBox=\"0 0 {WIDTH} {HEIGHT}\">\n\
         <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n"
    )
}

fn title(text: &str) -> String {
    format!(
        "<text x=\"{:.1}\" y=\"24\" font-size=\"16\" text-anchor=\"middle\">{}</text>\n",
        WIDTH / 2.0,
        escape_text(text)
    )
}

fn legend() -> String {
    format!(
        "<rect x=\"{x}\" y=\"34\" width=\"12\" height=\"12\" fill=\"{REF_COLOR}\"/>\
         <text x=\"{tx}\" y=\"44\" font-size=\"12\">reference</text>\n\
         <rect x=\"{x2}\" y=\"34\" width=\"12\" height=\"12\" fill=\"{NEW_COLOR}\"/>\
         <text x=\"{tx2}\" y=\"44\" font-size=\"12\">new</text>\n",
        x = WIDTH - 220.0,
        tx = WIDTH - 204.0,
        x2 = WIDTH - 120.0,
        tx2 = WIDTH - 104.0,
    )
}

fn axis() -> String {
    format!(
        "<line x1=\"{m}\" y1=\"{b}\" x2=\"{r}\" y2=\"{b}\" stroke=\"#333\"/>\n\
         <line x1=\"{m}\" y1=\"{m}\" x2=\"{m}\" y2=\"{b}\" stroke=\"#333\"/>\n",
        m = MARGIN,
        b = HEIGHT - MARGIN,
        r = WIDTH - MARGIN,
    )
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_chart_names_and_content() {
        let ref_freqs = vec![("red".to_string(), 0.5), ("blue".to_string(), 0.5)];
        let new_freqs = vec![("blue".to_string(), 1.0)];

        let chart = frequency_chart("color", &ref_freqs, &new_freqs, true);
        let body = String::from_utf8(chart.bytes).unwrap();

        assert_eq!(chart.name, "color_frequency.svg");
        assert!(body.starts_with("<svg"));
        assert!(body.contains("drift detected: true"));
        assert!(body.contains("red"));
        assert!(body.contains("blue"));
    }

    #[test]
    fn test_density_chart_draws_both_curves() {
        let reference: Vec<f64> = (0..50).map(|i| i as f64 / 10.0).collect();
        let new: Vec<f64> = (0..50).map(|i| 3.0 + i as f64 / 10.0).collect();

        let chart = density_chart("age", &reference, &new, false);
        let body = String::from_utf8(chart.bytes).unwrap();

        assert_eq!(chart.name, "age_density.svg");
        assert_eq!(body.matches("<polyline").count(), 2);
    }

    #[test]
    fn test_heatmap_colors_by_threshold() {
        let entries = vec![
            ("age".to_string(), Some(0.001)),
            ("sex".to_string(), Some(0.9)),
            ("site".to_string(), None),
        ];

        let chart = p_value_heatmap(&entries, 0.05);
        let body = String::from_utf8(chart.bytes).unwrap();

        assert_eq!(chart.name, "pvalues_summary.svg");
        assert!(body.contains("#d65f5f"));
        assert!(body.contains("#4878cf"));
        assert!(body.contains("#9e9e9e"));
        assert!(body.contains("n/a"));
    }

    #[test]
    fn test_kde_integrates_to_about_one() {
        let values: Vec<f64> = (0..100).map(|i| (i % 10) as f64).collect();
        let curve = kde_curve(&values, -5.0, 15.0);

        let step = 20.0 / 199.0;
        let integral: f64 = curve.iter().sum::<f64>() * step;
        assert!((integral - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a<b&c"), "a&lt;b&amp;c");
    }
}
