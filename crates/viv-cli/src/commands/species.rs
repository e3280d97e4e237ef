use std::path::Path;

use comfy_table::{ContentArrangement, Table};

pub fn run(species: Option<&Path>) -> Result<(), String> {
    let table_data = super::load_species(species)?;

    if table_data.is_empty() {
        println!("  No species defined.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Id", "Name", "Pool", "Cap", "Speed", "Lifespan", "Sense", "Mating",
    ]);

    for s in table_data.iter() {
        let lifespan = s
            .lifespan
            .map(|l| format!("{l:.0}s"))
            .unwrap_or_else(|| "—".to_string());
        let mating = if s.mate_radius > 0.0 {
            format!("r={:.0}, every {:.0}s", s.mate_radius, s.mate_cooldown)
        } else {
            "—".to_string()
        };
        table.add_row(vec![
            s.id.0.to_string(),
            s.name.clone(),
            s.pool.clone(),
            s.cap.to_string(),
            format!("{:.0}", s.speed),
            lifespan,
            format!("{:.0}", s.sense_radius),
            mating,
        ]);
    }

    println!("{table}");
    println!();
    println!("  {} species", table_data.len());

    Ok(())
}
