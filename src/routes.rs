use crate::{
    api::{employee, health, payroll},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::AppError,
    store::{CredentialStore, EmployeeStore, PayrollStore},
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Result, anyhow};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {requests_per_min}/min"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

/// Per-route rate limiters. Built once and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    login: Limiter,
    refresh: Limiter,
    protected: Limiter,
}

impl Limiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            refresh: build_limiter(config.rate_refresh_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

/// Registers the config, the store behind each trait and the extractor
/// error handlers.
pub fn app_data<S>(cfg: &mut web::ServiceConfig, config: &Config, store: Arc<S>)
where
    S: PayrollStore + EmployeeStore + CredentialStore + 'static,
{
    let payroll_store: Arc<dyn PayrollStore> = store.clone();
    let employee_store: Arc<dyn EmployeeStore> = store.clone();
    let credential_store: Arc<dyn CredentialStore> = store;

    cfg.app_data(web::Data::new(config.clone()))
        .app_data(web::Data::from(payroll_store))
        .app_data(web::Data::from(employee_store))
        .app_data(web::Data::from(credential_store))
        .app_data(
            web::JsonConfig::default()
                .error_handler(|err, _req| AppError::unprocessable(err.to_string()).into()),
        )
        .app_data(
            web::QueryConfig::default()
                .error_handler(|err, _req| AppError::unprocessable(err.to_string()).into()),
        );
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.service(web::resource("/health").route(web::get().to(health::health)));

    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(web::resource("/me").route(web::get().to(handlers::me)))
            .service(web::resource("/users").route(web::post().to(handlers::register)))
            .service(
                web::resource("/change-password")
                    .route(web::post().to(handlers::change_password)),
            )
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/payroll")
                    .service(
                        web::resource("/calculate").route(web::post().to(payroll::calculate)),
                    )
                    .service(web::resource("/report").route(web::get().to(payroll::report)))
                    .service(
                        web::resource("/payslip/{employee_id}/{month}")
                            .route(web::get().to(payroll::payslip)),
                    ),
            )
            .service(
                web::scope("/admin/payroll").service(
                    web::resource("/{id}")
                        .route(web::get().to(payroll::get_payroll))
                        .route(web::put().to(payroll::update_payroll))
                        .route(web::delete().to(payroll::delete_payroll)),
                ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token, old refresh_token revoked
