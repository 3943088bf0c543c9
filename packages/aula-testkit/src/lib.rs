//! Shared plumbing for tests that need real Postgres and Qdrant instances.
//! Each test gets a throwaway database; Qdrant collections are registered as
//! they are created and deleted on cleanup.

mod error;

pub use error::{Error, Result};

use std::{collections::HashSet, env, str::FromStr, sync::Mutex, thread, time::Duration};

use qdrant_client::Qdrant;
use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::{runtime::Builder, time};
use uuid::Uuid;

// The DSN's own database is tried first; these cover a DSN that points at an
// already-dropped test database.
const FALLBACK_ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];
const CALL_TIMEOUT: Duration = Duration::from_secs(10);
const DELETE_ATTEMPTS: u32 = 3;
const RETRY_PAUSE: Duration = Duration::from_millis(200);

pub struct TestDatabase {
	name: String,
	dsn: String,
	admin_options: PgConnectOptions,
	cleaned: bool,
	collections: Mutex<HashSet<String>>,
}
impl TestDatabase {
	/// Creates a fresh `aula_test_{uuid}` database on the server behind
	/// `base_dsn`.
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base_options = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error(format!("Failed to parse AULA_PG_DSN: {err}.")))?;
		let (admin_options, mut admin_conn) = admin_connect(&base_options).await?;
		let name = format!("aula_test_{}", Uuid::new_v4().simple());

		admin_conn
			.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
			.await
			.map_err(|err| Error(format!("Failed to create test database: {err}.")))?;

		let dsn = base_options.database(&name).to_url_lossy().to_string();

		Ok(Self {
			name,
			dsn,
			admin_options,
			cleaned: false,
			collections: Mutex::new(HashSet::new()),
		})
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// A collection prefix unique to this test database, so concurrent test
	/// runs never collide in a shared Qdrant.
	pub fn collection_prefix(&self) -> String {
		self.name.clone()
	}

	/// Registers a Qdrant collection for deletion on cleanup. Collection
	/// names are derived from course ids by the store, so tests hand the
	/// derived name over rather than a prefix.
	pub fn track_collection(&self, collection: impl Into<String>) {
		let mut tracked = self.collections.lock().unwrap_or_else(|err| err.into_inner());

		tracked.insert(collection.into());
	}

	/// Drops the database and every tracked collection. Tests call this on
	/// their happy path; a panic leaves the work to `Drop` instead.
	pub async fn cleanup(mut self) -> Result<()> {
		let collections = self.tracked_collections();

		drop_collections(&collections).await?;
		drop_database(&self.name, &self.admin_options).await?;

		self.cleaned = true;

		Ok(())
	}

	fn tracked_collections(&self) -> Vec<String> {
		let tracked = self.collections.lock().unwrap_or_else(|err| err.into_inner());

		tracked.iter().cloned().collect()
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let name = self.name.clone();
		let admin_options = self.admin_options.clone();
		let collections = self.tracked_collections();
		// Drop usually fires on a tokio worker thread, where block_on would
		// panic. The cleanup gets its own thread and single-thread runtime.
		let cleanup_thread = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test cleanup runtime failed to start: {err}.");

					return;
				},
			};
			let result = runtime.block_on(async {
				drop_collections(&collections).await?;
				drop_database(&name, &admin_options).await
			});

			if let Err(err) = result {
				eprintln!("Test cleanup failed: {err}.");
			}
		});
		let _ = cleanup_thread.join();
	}
}

pub fn env_dsn() -> Option<String> {
	env::var("AULA_PG_DSN").ok()
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("AULA_QDRANT_URL").ok()
}

async fn admin_connect(base: &PgConnectOptions) -> Result<(PgConnectOptions, PgConnection)> {
	let mut candidates = Vec::new();

	if base.get_database().is_some() {
		candidates.push(base.clone());
	}
	for fallback in FALLBACK_ADMIN_DATABASES {
		candidates.push(base.clone().database(fallback));
	}

	let mut last_err = None;

	for options in candidates {
		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => {
				last_err = Some(err);
			},
		}
	}

	Err(Error(format!("No admin database reachable via AULA_PG_DSN: {last_err:?}.")))
}

async fn drop_database(name: &str, admin_options: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin_options)
		.await
		.map_err(|err| Error(format!("Failed to reconnect for cleanup: {err}.")))?;

	// FORCE kicks any pool connection the test left open.
	conn.execute(format!(r#"DROP DATABASE IF EXISTS "{name}" WITH (FORCE)"#).as_str())
		.await
		.map_err(|err| Error(format!("Failed to drop test database {name:?}: {err}.")))?;

	Ok(())
}

async fn drop_collections(collections: &[String]) -> Result<()> {
	if collections.is_empty() {
		return Ok(());
	}

	let Some(url) = env_qdrant_url() else {
		eprintln!("Skipping Qdrant cleanup; set AULA_QDRANT_URL to delete test collections.");

		return Ok(());
	};
	let client = Qdrant::from_url(&url)
		.build()
		.map_err(|err| Error(format!("Failed to build Qdrant client: {err}.")))?;

	for collection in collections {
		drop_collection(&client, collection).await?;
	}

	Ok(())
}

/// Deletes one collection, tolerating one that was tracked but never actually
/// created.
async fn drop_collection(client: &Qdrant, collection: &str) -> Result<()> {
	let mut last_err = String::new();

	for _ in 0..DELETE_ATTEMPTS {
		let attempt = time::timeout(CALL_TIMEOUT, async {
			if !client.collection_exists(collection).await? {
				return Ok(false);
			}

			client.delete_collection(collection).await.map(|_| true)
		})
		.await;

		match attempt {
			Ok(Ok(_)) => return Ok(()),
			Ok(Err(err)) => last_err = err.to_string(),
			Err(_) => last_err = "call timed out".to_string(),
		}

		time::sleep(RETRY_PAUSE).await;
	}

	Err(Error(format!("Failed to delete Qdrant collection {collection:?}: {last_err}.")))
}
