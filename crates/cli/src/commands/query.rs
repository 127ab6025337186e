//! `edupolicy rag|sql|web` — call one tool directly, outside the reasoning loop.

pub async fn rag(query: &str, top_k: Option<usize>) -> anyhow::Result<()> {
    let controller = super::controller().await?;
    let answer = controller.rag_query(query, top_k).await;
    println!("{}", answer.context);
    if !answer.snippets.is_empty() {
        println!();
        println!("  {} passage(s) retrieved", answer.snippets.len());
    }
    Ok(())
}

pub async fn sql(question: &str) -> anyhow::Result<()> {
    let controller = super::controller().await?;
    println!("{}", controller.sql_query(question).await);
    Ok(())
}

pub async fn web(query: &str, max_results: Option<usize>) -> anyhow::Result<()> {
    let controller = super::controller().await?;
    println!("{}", controller.web_query(query, max_results).await);
    Ok(())
}
