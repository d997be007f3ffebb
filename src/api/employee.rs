// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process employee record. It is not persisted and resets on restart.

use axum::{extract::State, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{Employee, ErrorResponse, UpdateEmployeeRequest},
    state::AppState,
};

/// Record served until the first update.
pub fn seed_employee() -> Employee {
    Employee {
        id: 1,
        name: "Jane Doe".to_string(),
        employee_id: "10000001".to_string(),
        department: "EX0600".to_string(),
        email: "jane.doe@example.com".to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/api/employee",
    tag = "Employee",
    responses((status = 200, body = Employee))
)]
pub async fn get_employee(State(state): State<AppState>) -> Json<Employee> {
    Json(state.employee.read().await.clone())
}

#[utoipa::path(
    get,
    path = "/api/employees",
    tag = "Employee",
    responses((status = 200, body = [Employee]))
)]
pub async fn list_employees(State(state): State<AppState>) -> Json<Vec<Employee>> {
    Json(vec![state.employee.read().await.clone()])
}

#[utoipa::path(
    put,
    path = "/api/employee",
    request_body = UpdateEmployeeRequest,
    tag = "Employee",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = Employee),
        (status = 400, description = "A provided field is blank", body = ErrorResponse)
    )
)]
pub async fn update_employee(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<UpdateEmployeeRequest>,
) -> Result<Json<Employee>, ApiError> {
    let fields = [
        &request.name,
        &request.employee_id,
        &request.department,
        &request.email,
    ];
    if fields
        .iter()
        .any(|field| field.as_deref().is_some_and(|v| v.trim().is_empty()))
    {
        return Err(ApiError::bad_request("Employee fields cannot be blank"));
    }

    let mut employee = state.employee.write().await;
    if let Some(name) = request.name {
        employee.name = name;
    }
    if let Some(employee_id) = request.employee_id {
        employee.employee_id = employee_id;
    }
    if let Some(department) = request.department {
        employee.department = department;
    }
    if let Some(email) = request.email {
        employee.email = email;
    }
    tracing::info!(user_id = user.user_id, "Employee record updated");
    Ok(Json(employee.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedUser, LoginType, Role};
    use crate::state::test_support::test_state;
    use axum::http::StatusCode;

    fn caller() -> Auth {
        Auth(AuthenticatedUser {
            user_id: 1,
            email: "admin@example.com".into(),
            role: Role::Admin,
            login_type: LoginType::Password,
            expires_at: chrono::Utc::now().timestamp() + 3600,
        })
    }

    #[tokio::test]
    async fn update_merges_given_fields() {
        let (state, _dir) = test_state();

        let Json(updated) = update_employee(
            caller(),
            State(state.clone()),
            Json(UpdateEmployeeRequest {
                department: Some("RD0100".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.department, "RD0100");
        assert_eq!(updated.name, seed_employee().name);

        let Json(current) = get_employee(State(state.clone())).await;
        assert_eq!(current, updated);
        let Json(all) = list_employees(State(state)).await;
        assert_eq!(all, vec![updated]);
    }

    #[tokio::test]
    async fn blank_field_is_rejected() {
        let (state, _dir) = test_state();
        let err = update_employee(
            caller(),
            State(state.clone()),
            Json(UpdateEmployeeRequest {
                name: Some("  ".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let Json(current) = get_employee(State(state)).await;
        assert_eq!(current, seed_employee());
    }
}
