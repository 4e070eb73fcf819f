use anyhow::Result;

use faultline_db::init_schema;

use crate::app::AppContext;

pub async fn run_init(app: &AppContext) -> Result<()> {
    let dimension = app.backend.dimension();
    init_schema(app.store.pool(), dimension).await?;
    println!("Schema initialized (embedding dimension {dimension}).");
    Ok(())
}
