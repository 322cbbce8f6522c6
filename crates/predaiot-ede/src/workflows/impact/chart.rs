use super::ReportWriteError;
use crate::workflows::portfolio::ProjectedEntity;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;

const GAIN_CHART_SIZE: (u32, u32) = (1200, 720);
const BEFORE_AFTER_CHART_SIZE: (u32, u32) = (1440, 1120);

const YIELD_GAIN_COLOR: RGBColor = RGBColor(0x00, 0xA8, 0x6B);
const REVENUE_GAIN_COLOR: RGBColor = RGBColor(0xFF, 0xD7, 0x00);
const BEFORE_COLOR: RGBColor = RGBColor(0xFF, 0x6B, 0x6B);
const AFTER_COLOR: RGBColor = RGBColor(0x4E, 0xCD, 0xC4);
const FIXED_COLOR: RGBColor = RGBColor(0xAA, 0xAA, 0xAA);

struct MetricPanel {
    title: &'static str,
    values: fn(&ProjectedEntity) -> Option<(f64, f64)>,
    /// Drawn as one bar per plant; the figure is not boosted.
    fixed: bool,
}

const PANELS: [MetricPanel; 5] = [
    MetricPanel {
        title: "Total Yield (kWh)",
        values: yield_pair,
        fixed: false,
    },
    MetricPanel {
        title: "Equivalent Hours (h)",
        values: hours_pair,
        fixed: false,
    },
    MetricPanel {
        title: "Revenue (OMR)",
        values: revenue_pair,
        fixed: false,
    },
    MetricPanel {
        title: "CO\u{2082} Reduction (kg)",
        values: co2_pair,
        fixed: false,
    },
    MetricPanel {
        title: "Installed Power (kWp)",
        values: power_pair,
        fixed: true,
    },
];

fn yield_pair(entity: &ProjectedEntity) -> Option<(f64, f64)> {
    entity.yield_kwh.map(|metric| (metric.before, metric.after))
}

fn hours_pair(entity: &ProjectedEntity) -> Option<(f64, f64)> {
    entity.equivalent_hours.map(|metric| (metric.before, metric.after))
}

fn revenue_pair(entity: &ProjectedEntity) -> Option<(f64, f64)> {
    Some((entity.revenue.before, entity.revenue.after))
}

fn co2_pair(entity: &ProjectedEntity) -> Option<(f64, f64)> {
    entity.co2_reduction_kg.map(|metric| (metric.before, metric.after))
}

fn power_pair(entity: &ProjectedEntity) -> Option<(f64, f64)> {
    entity.installed_power_kwp.map(|power| (power, power))
}

/// Per-plant yield and revenue gains as overlapping bars, rendered to SVG.
pub fn gain_chart_svg(entities: &[ProjectedEntity]) -> Result<String, ReportWriteError> {
    let names = plant_names(entities);
    let yield_gains: Vec<f64> = entities
        .iter()
        .map(|entity| entity.yield_kwh.map_or(0.0, |metric| metric.gain))
        .collect();
    let revenue_gains: Vec<f64> = entities.iter().map(|entity| entity.revenue.gain).collect();

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, GAIN_CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("PredAIoT Impact: Yield & Revenue Gains", ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(80)
            .y_label_area_size(90)
            .build_cartesian_2d(
                (0..names.len().max(1)).into_segmented(),
                value_range(yield_gains.iter().chain(&revenue_gains).copied()),
            )?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(names.len().max(1))
            .x_label_formatter(&|value| plant_label(&names, value))
            .x_desc("Plant")
            .y_desc("Gain")
            .draw()?;

        let yield_style = YIELD_GAIN_COLOR.filled();
        chart
            .draw_series(bars(&yield_gains, yield_style))?
            .label("Yield Gain (kWh)")
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], yield_style));

        let revenue_style = REVENUE_GAIN_COLOR.mix(0.7).filled();
        chart
            .draw_series(bars(&revenue_gains, revenue_style))?
            .label("Revenue Gain (OMR)")
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], revenue_style));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        root.present()?;
    }
    Ok(svg)
}

/// Before/after bars per plant, one panel per metric, rendered to SVG.
pub fn before_after_chart_svg(entities: &[ProjectedEntity]) -> Result<String, ReportWriteError> {
    let names = plant_names(entities);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, BEFORE_AFTER_CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled("PredAIoT + EDE: Before vs After Performance", ("sans-serif", 32))?;

        let areas = root.split_evenly((3, 2));
        for (panel, area) in PANELS.iter().zip(areas.iter()) {
            draw_panel(area, panel, entities, &names)?;
        }
        root.present()?;
    }
    Ok(svg)
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &MetricPanel,
    entities: &[ProjectedEntity],
    names: &[&str],
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let pairs: Vec<Option<(f64, f64)>> = entities.iter().map(panel.values).collect();

    let mut chart = ChartBuilder::on(area)
        .caption(panel.title, ("sans-serif", 20))
        .margin(12)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(
            (0..names.len().max(1)).into_segmented(),
            value_range(pairs.iter().flatten().flat_map(|(before, after)| [*before, *after])),
        )?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(names.len().max(1))
        .x_label_formatter(&|value| plant_label(names, value))
        .draw()?;

    if panel.fixed {
        let style = FIXED_COLOR.filled();
        let fixed: Vec<f64> = pairs
            .iter()
            .map(|pair| pair.map_or(0.0, |(value, _)| value))
            .collect();
        chart
            .draw_series(bars(&fixed, style))?
            .label("Installed Power (fixed)")
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], style));
    } else {
        let before_style = BEFORE_COLOR.filled();
        chart
            .draw_series(pairs.iter().enumerate().filter_map(|(index, pair)| {
                pair.map(|(before, _)| {
                    let mut bar = Rectangle::new(
                        [
                            (SegmentValue::Exact(index), 0.0),
                            (SegmentValue::CenterOf(index), before),
                        ],
                        before_style,
                    );
                    bar.set_margin(0, 0, 6, 1);
                    bar
                })
            }))?
            .label("Before PredAIoT")
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], before_style));

        let after_style = AFTER_COLOR.filled();
        chart
            .draw_series(pairs.iter().enumerate().filter_map(|(index, pair)| {
                pair.map(|(_, after)| {
                    let mut bar = Rectangle::new(
                        [
                            (SegmentValue::CenterOf(index), 0.0),
                            (SegmentValue::Exact(index + 1), after),
                        ],
                        after_style,
                    );
                    bar.set_margin(0, 0, 1, 6);
                    bar
                })
            }))?
            .label("After PredAIoT")
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], after_style));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn bars(
    values: &[f64],
    style: ShapeStyle,
) -> impl Iterator<Item = Rectangle<(SegmentValue<usize>, f64)>> + '_ {
    values.iter().enumerate().map(move |(index, value)| {
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(index), 0.0),
                (SegmentValue::Exact(index + 1), *value),
            ],
            style,
        );
        bar.set_margin(0, 0, 8, 8);
        bar
    })
}

fn plant_names(entities: &[ProjectedEntity]) -> Vec<&str> {
    entities.iter().map(|entity| entity.name.as_str()).collect()
}

fn plant_label(names: &[&str], value: &SegmentValue<usize>) -> String {
    match value {
        SegmentValue::CenterOf(index) => names
            .get(*index)
            .map(|name| name.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Y range covering every finite value and zero, padded by a tenth.
fn value_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (low, high) = values
        .into_iter()
        .filter(|value| value.is_finite())
        .fold((0.0_f64, 0.0_f64), |(low, high), value| {
            (low.min(value), high.max(value))
        });

    let span = high - low;
    if span <= f64::EPSILON {
        return 0.0..1.0;
    }
    let pad = span * 0.1;
    let low = if low < 0.0 { low - pad } else { 0.0 };
    low..high + pad
}
