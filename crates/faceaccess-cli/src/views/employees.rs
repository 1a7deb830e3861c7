use std::fmt::Write;

use faceaccess_core::models::Employee;

use crate::utils::truncate_string;

const NAME_WIDTH: usize = 24;
const EMAIL_WIDTH: usize = 28;

pub fn render_employees(employees: &[Employee]) -> String {
    if employees.is_empty() {
        return "No employees enrolled.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:<name$} {:<email$} {:<10} {}",
        "ID", "Name", "Email", "Role", "Status",
        name = NAME_WIDTH,
        email = EMAIL_WIDTH
    );
    for employee in employees {
        let _ = writeln!(
            out,
            "{:<12} {:<name$} {:<email$} {:<10} {}",
            truncate_string(&employee.employee_id, 12),
            truncate_string(&employee.name, NAME_WIDTH),
            truncate_string(employee.email.as_deref().unwrap_or("-"), EMAIL_WIDTH),
            truncate_string(&employee.role, 10),
            employee.status_label(),
            name = NAME_WIDTH,
            email = EMAIL_WIDTH
        );
    }
    let _ = writeln!(out, "\n{} employee(s)", employees.len());
    out
}
