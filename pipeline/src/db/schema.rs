use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // Prices are decimal text so no precision is lost in the round trip.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS price_history (
  date TEXT NOT NULL,
  item TEXT NOT NULL,
  price TEXT NOT NULL,
  currency TEXT NOT NULL,
  source TEXT NOT NULL,
  PRIMARY KEY (date, item)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_price_history_item ON price_history(item);"#)
        .execute(pool)
        .await?;

    Ok(())
}
