use egolab_ego::{AcquisitionSpec, Observation, Parameter, SessionBuilder, SurrogateSpec};
use ndarray::{array, ArrayBase, Data, Ix1};

// Impurity (%) of a synthetic batch process, minimum 0.8 at (72.5, 33.)
fn impurity(x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> f64 {
    let (temperature, time) = (x[0], x[1]);
    0.8 + ((temperature - 72.5) / 12.).powi(2)
        + ((time - 33.) / 9.).powi(2)
        + 0.3 * ((temperature - 72.5) / 12.) * ((time - 33.) / 9.)
}

fn main() -> anyhow::Result<()> {
    // surrogate chosen from the command line: gp (default), rf or et
    let surrogate = match std::env::args().nth(1).as_deref() {
        Some("rf") => SurrogateSpec::random_forest(),
        Some("et") => SurrogateSpec::extra_trees(),
        _ => SurrogateSpec::gp(),
    };

    // Two batches already run in the lab
    let priors = vec![
        Observation::new(array![40., 20.], impurity(&array![40., 20.])),
        Observation::new(array![90., 50.], impurity(&array![90., 50.])),
    ];

    let session = SessionBuilder::minimize()
        .configure(|config| {
            config
                .surrogate(surrogate)
                .acquisition(AcquisitionSpec::hedge())
                .seed(42)
        })
        .initial_observations(priors)
        .within(vec![
            Parameter::new("Temperature", 20., 100.),
            Parameter::new("Time", 1., 60.),
        ])?;

    for i in 0..20 {
        let proposal = session.ask()?;
        let y = impurity(&proposal.x);
        println!(
            "#{i:02} {:?} x = {} -> impurity = {y:.4} (predicted {:?})",
            session.state(),
            proposal.x,
            proposal.predicted_mean
        );
        session.tell(&proposal.x, y)?;
    }

    let best = session.best_observed()?;
    println!("Best impurity {:.4} at x = {}", best.y, best.x);
    session.close();
    Ok(())
}
