use savings_optimizer::{
    calculate_all,
    calculator::{format_money, format_money_cents},
    optimize, allocate_spend,
    optimizer::describe_distribution,
    session::SessionInputs,
    AppConfig, CalculatorSession, Requirements, TracingProgress,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    info!("Savings Optimizer starting");

    let config = AppConfig::from_env()?;
    let table = config.load_tiers()?;

    let total_amount: u64 = std::env::var("DEMO_AMOUNT")
        .unwrap_or_else(|_| "100000".to_string())
        .parse()?;
    let total_spend = 1_500.0;

    // A sample customer
    let requirements = Requirements {
        has_salary: true,
        salary_amount: 5_000.0,
        spend_amount: total_spend,
        giro_count: 3,
        has_insurance: true,
        insurance_amount: 200.0,
        ..Default::default()
    };

    let mut session = CalculatorSession::new();
    session.record_inputs(SessionInputs {
        deposit: total_amount as f64,
        requirements: requirements.clone(),
        total_spend: Some(total_spend),
    });

    info!(
        session_id = %session.session_id,
        total_amount = total_amount,
        "Running calculator"
    );

    session.record_calculations(calculate_all(total_amount as f64, &table, &requirements));
    println!("\n=== SINGLE PRODUCT COMPARISON ===");
    println!("{}", session.summary());

    let outcome = optimize(
        total_amount,
        &table,
        &requirements,
        &config.optimizer,
        &mut TracingProgress,
    )?;

    println!("=== BEST DISTRIBUTIONS OF {} ===", format_money(total_amount as f64));
    for (i, solution) in outcome.solutions.iter().enumerate() {
        let salary = solution
            .salary_product
            .map(|p| p.to_string())
            .unwrap_or_else(|| "none".to_string());
        println!(
            "  {}: {} per year, salary to {}: {}",
            i + 1,
            format_money_cents(solution.total_interest),
            salary,
            describe_distribution(&solution.distribution)
        );
    }
    for (product, fault) in &outcome.faults {
        println!("  ! {} skipped: {}", product, fault);
    }
    println!(
        "  ({} splits evaluated, {} within tolerance)",
        outcome.evaluated, outcome.accepted
    );

    if let Some(best) = outcome.best().cloned() {
        let allocation = allocate_spend(
            total_spend,
            &best.distribution,
            &table,
            &requirements,
            best.salary_product,
        )?;

        println!("\n=== CARD SPEND FOR THE BEST DISTRIBUTION ===");
        if allocation.allocation.is_empty() {
            println!("  No spend allocation improves on the best distribution");
        }
        for (product, spend) in &allocation.allocation {
            println!("  {}: {}", product, format_money(*spend));
        }
        println!(
            "  Total interest: {}",
            format_money_cents(allocation.total_interest)
        );
        session.record_spend(allocation);
    }

    session.record_optimization(outcome);
    info!(session_id = %session.session_id, "Done");

    Ok(())
}
