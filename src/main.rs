use lamport_rs::cluster::{run_lamport, run_naive};
use lamport_rs::{Config, Scenario};

#[tokio::main]
async fn main() -> lamport_rs::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let scenario = Scenario::textbook();

    println!("== naive replication (no logical clock)");
    let (a, b) = run_naive(config.clone(), &scenario).await?;
    println!("Final state in Node A: {}", a);
    println!("Final state in Node B: {}", b);
    if a != b {
        println!("Replicas diverged");
    }

    println!("== replication ordered by Lamport clocks");
    let outcome = run_lamport(config, &scenario).await?;
    println!("Final queue state in Node A: {} -> {}", outcome.a.log, outcome.a.state);
    println!("Final queue state in Node B: {} -> {}", outcome.b.log, outcome.b.state);
    if !outcome.converged() {
        println!("Replicas diverged");
    }

    Ok(())
}
