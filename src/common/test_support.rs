use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

// Pool em memória para testes. Uma única conexão: cada conexão
// "sqlite::memory:" nova seria um banco vazio diferente.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("falha ao abrir o banco em memória");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("falha ao rodar as migrações no banco de teste");

    pool
}
