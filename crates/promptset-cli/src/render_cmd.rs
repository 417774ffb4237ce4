//! `promptset render`: show what an outbound request would look like.

use anyhow::Result;
use serde::Serialize;

use promptset_core::SessionCoordinator;

use crate::output::Printer;

#[derive(Serialize)]
struct Rendered {
    system: String,
    user: String,
}

pub fn cmd_render(
    session: &SessionCoordinator,
    printer: Printer,
    system: &str,
    user: &str,
) -> Result<()> {
    let (system, user) = session.process_llm_request(system, user);
    let rendered = Rendered { system, user };
    printer.view(&rendered, || {
        if rendered.user.is_empty() {
            rendered.system.clone()
        } else {
            format!("[system]\n{}\n\n[user]\n{}", rendered.system, rendered.user)
        }
    })
}
