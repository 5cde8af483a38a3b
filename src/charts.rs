use crate::logger::Logger;
use crate::scenarios::adaptive;
use crate::simulationrun::SimulationRun;
use plotters::prelude::*;
use std::fs;

/// Run the adaptive scenario's auction and chart every bidder's balance over the rounds
pub fn generate_balance_charts() -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all("charts")?;

    let params = adaptive::simulation_params();
    let mut auction = adaptive::prepare_auction(params)?;
    let simulation_run = SimulationRun::new(&mut auction, params.num_rounds, &mut Logger::new())?;

    let names: Vec<String> = auction.bidders().bidders.iter()
        .map(|bidder| bidder.bidder_name().to_string())
        .collect();
    create_balance_chart(&simulation_run, &names, "Adaptive bidders: balance per round", "charts/adaptive_balances.png")?;

    Ok(())
}

/// Draw one line per bidder, bidders without a balance of their own are skipped
fn create_balance_chart(
    simulation_run: &SimulationRun,
    names: &[String],
    title: &str,
    filepath: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let num_rounds = simulation_run.balance_history.len();
    if num_rounds == 0 {
        return Err("No rounds to chart".into());
    }

    let series: Vec<Vec<(f64, f64)>> = (0..names.len())
        .map(|bidder_id| {
            simulation_run.balance_history.iter().enumerate()
                .filter_map(|(round, balances)| balances[bidder_id].map(|balance| ((round + 1) as f64, balance)))
                .collect()
        })
        .collect();

    let y_min = series.iter().flatten().map(|(_, y)| *y).fold(0.0, f64::min);
    let y_max = series.iter().flatten().map(|(_, y)| *y).fold(0.0, f64::max);
    let y_range = if y_max - y_min < 0.1 {
        y_min - 0.5..y_max + 0.5
    } else {
        y_min..y_max
    };

    let root = BitMapBackend::new(filepath, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(1.0..num_rounds as f64, y_range)?;

    chart.configure_mesh()
        .x_desc("Round")
        .y_desc("Balance")
        .draw()?;

    for (bidder_id, points) in series.into_iter().enumerate() {
        if points.is_empty() {
            continue;
        }
        let color = Palette99::pick(bidder_id).to_rgba();
        chart.draw_series(LineSeries::new(points, &color))?
            .label(names[bidder_id].as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }

    // Break-even line
    chart.draw_series(LineSeries::new(
        vec![(1.0, 0.0), (num_rounds as f64, 0.0)],
        &BLACK.mix(0.3),
    ))?;

    chart.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    println!("Generated: {}", filepath);

    Ok(())
}
