use crate::commands::CommandResult;
use washline_core::config::{AppConfig, LoadOptions};
use washline_core::domain::conversation::TenantId;
use washline_db::{connect_with_settings, migrations, seed_demo_tenant};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let tenant_id = TenantId(config.tenant.default_tenant_id.clone());
    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seeded = seed_demo_tenant(&pool, &tenant_id)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 6u8))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(seeded)
    });

    match result {
        Ok(seeded) if seeded.already_seeded => CommandResult::success(
            "seed",
            format!("tenant `{}` already seeded, nothing to do", tenant_id.0),
        ),
        Ok(seeded) => CommandResult::success(
            "seed",
            format!(
                "seeded tenant `{}`: {} services, {} areas, {} slots",
                tenant_id.0, seeded.services_inserted, seeded.areas_inserted, seeded.slots_inserted
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}
