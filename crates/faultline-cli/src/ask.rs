use anyhow::Result;

use faultline_rag::{AskOptions, RagEngine};

use crate::app::AppContext;
use crate::search::print_results;

pub async fn run_ask(app: &AppContext, query: &str, options: &AskOptions) -> Result<()> {
    let engine = RagEngine::new(app.store.clone(), app.search.clone(), app.backend.clone());
    let answer = engine.answer(query, options).await?;

    println!("{}", answer.answer);

    // Raw matches afterwards, for judging whether the answer is grounded.
    println!();
    if answer.results.is_empty() {
        println!("No matches at or above the similarity threshold.");
    } else {
        println!("Matches:");
        print_results(&answer.results);
    }

    Ok(())
}
