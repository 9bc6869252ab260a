use serde::{Deserialize, Serialize};

use super::{CustomerId, EmployeeId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(rename = "employeeId")]
    pub id: EmployeeId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "customerId")]
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Label for an employee reference. `None` means the employee is not
/// known to the caller, either because it was never loaded or because the
/// reference dangles; both render the same placeholder.
pub fn employee_label(employee: Option<&Employee>) -> String {
    employee
        .map(Employee::full_name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Unknown employee".to_string())
}

pub fn customer_label(customer: Option<&Customer>, id: CustomerId) -> String {
    customer
        .map(Customer::full_name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("Customer #{}", id))
}
