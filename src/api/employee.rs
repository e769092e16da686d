use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::employee::{CreateEmployee, Employee, EmployeeQuery, UpdateEmployee},
    store::EmployeeStore,
};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: i64,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 409, description = "Email already exists", body = Object, example = json!({
            "status": "conflict",
            "error": "Email already exists"
        })),
        (status = 422, description = "Invalid payload")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
#[instrument(name = "employee_create", skip(auth, store, payload), fields(email = %payload.email))]
pub async fn create_employee(
    auth: AuthUser,
    store: web::Data<dyn EmployeeStore>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;
    payload.validate()?;

    let employee = store.create_employee(&payload).await?;
    info!(employee_id = employee.id, "Employee created");

    Ok(HttpResponse::Created().json(employee))
}

#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    store: web::Data<dyn EmployeeStore>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_elevated()?;

    let (data, total) = store.list_employees(&query).await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data,
        page: query.page(),
        per_page: query.per_page(),
        total,
    }))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Email already exists"),
        (status = 422, description = "Invalid patch")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
#[instrument(name = "employee_update", skip(auth, store, body))]
pub async fn update_employee(
    auth: AuthUser,
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<u64>,
    body: web::Json<UpdateEmployee>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;
    body.validate()?;

    let employee_id = path.into_inner();

    match store.update_employee(employee_id, &body).await? {
        Some(employee) => Ok(HttpResponse::Ok().json(employee)),
        None => Err(AppError::not_found("Employee not found")),
    }
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
#[instrument(name = "employee_delete", skip(auth, store))]
pub async fn delete_employee(
    auth: AuthUser,
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;

    let employee_id = path.into_inner();

    if !store.delete_employee(employee_id).await? {
        return Err(AppError::not_found("Employee not found"));
    }

    info!("Employee deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "status": "not_found",
            "error": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_elevated()?;

    match store.get_employee(path.into_inner()).await? {
        Some(emp) => Ok(HttpResponse::Ok().json(emp)),
        None => Err(AppError::not_found("Employee not found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::testing::{TestApp, bearer};
    use actix_web::{http::StatusCode, test};
    use chrono::NaiveDate;

    fn new_employee(email: &str) -> CreateEmployee {
        CreateEmployee {
            full_name: "Le Van C".to_string(),
            email: email.to_string(),
            phone: None,
            department_id: Some(1),
            position_id: Some(1),
            hire_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            status: None,
        }
    }

    #[actix_web::test]
    async fn duplicate_email_is_a_conflict() {
        let app = TestApp::seeded();
        let service = test::init_service(app.build()).await;
        let token = bearer(&app.config, Role::Hr, None);

        let req = app
            .request(test::TestRequest::post().uri("/api/employees"))
            .insert_header(("Authorization", token.clone()))
            .set_json(new_employee("c.le@company.com"))
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = app
            .request(test::TestRequest::post().uri("/api/employees"))
            .insert_header(("Authorization", token))
            .set_json(new_employee("C.LE@company.com"))
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn unknown_department_is_unprocessable() {
        let app = TestApp::seeded();
        let service = test::init_service(app.build()).await;

        let mut body = new_employee("d.pham@company.com");
        body.department_id = Some(77);
        let req = app
            .request(test::TestRequest::post().uri("/api/employees"))
            .insert_header(("Authorization", bearer(&app.config, Role::Hr, None)))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn employee_role_cannot_create() {
        let app = TestApp::seeded();
        let service = test::init_service(app.build()).await;

        let req = app
            .request(test::TestRequest::post().uri("/api/employees"))
            .insert_header(("Authorization", bearer(&app.config, Role::Employee, Some(1))))
            .set_json(new_employee("x.y@company.com"))
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn partial_update_keeps_untouched_fields() {
        let app = TestApp::seeded();
        let service = test::init_service(app.build()).await;

        let req = app
            .request(test::TestRequest::put().uri("/api/employees/1"))
            .insert_header(("Authorization", bearer(&app.config, Role::Admin, None)))
            .set_json(json!({ "status": "inactive" }))
            .to_request();
        let employee: Employee = test::call_and_read_body_json(&service, req).await;

        assert_eq!(employee.status, "inactive");
        assert_eq!(employee.full_name, "Nguyen Van A");
        assert_eq!(employee.position_id, Some(1));
    }

    #[actix_web::test]
    async fn empty_patch_is_unprocessable() {
        let app = TestApp::seeded();
        let service = test::init_service(app.build()).await;

        let req = app
            .request(test::TestRequest::put().uri("/api/employees/1"))
            .insert_header(("Authorization", bearer(&app.config, Role::Admin, None)))
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn list_filters_by_search() {
        let app = TestApp::seeded();
        let service = test::init_service(app.build()).await;

        let req = app
            .request(test::TestRequest::get().uri("/api/employees?search=tran"))
            .insert_header(("Authorization", bearer(&app.config, Role::Hr, None)))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&service, req).await;

        assert_eq!(body["total"], 1);
        assert_eq!(body["data"][0]["full_name"], "Tran Thi B");
    }
}
