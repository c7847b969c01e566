//! Roster subcommands
//!
//! Each command runs against a loaded [`RosterController`] and returns the
//! text to print.

use clap::Subcommand;
use roster_sdk::{
    Experience, Reference, Result, RosterController, RosterRow, Submitted, User,
};
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum RosterCommands {
    /// List all users
    List,

    /// Show one user with biography and experiences
    Show {
        /// Row index as printed by `list`
        index: usize,

        /// Also reveal the password
        #[arg(long)]
        reveal: bool,
    },

    /// Register a new user
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        mail: String,

        #[arg(long)]
        password: String,

        /// Must repeat the password
        #[arg(long)]
        confirm: String,

        /// Biography
        #[arg(long, default_value = "")]
        comment: String,

        /// Experience id to reference (repeatable)
        #[arg(long = "experience")]
        experiences: Vec<String>,
    },

    /// Change fields of an existing user
    Edit {
        index: usize,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        mail: Option<String>,

        #[arg(long, requires = "confirm")]
        password: Option<String>,

        #[arg(long, requires = "password")]
        confirm: Option<String>,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Delete a user after confirmation
    Remove { index: usize },

    /// Query every experience a user owns or takes part in
    Experiences { index: usize },
}

/// Execute a roster command
pub async fn execute_command(controller: &RosterController, command: RosterCommands) -> Result<String> {
    match command {
        RosterCommands::List => Ok(format_list(&controller.rows().await)),

        RosterCommands::Show { index, reveal } => {
            controller.toggle_expanded(index).await?;
            controller.toggle_biography(index).await?;
            if reveal {
                controller.toggle_password(index).await?;
            }
            let row = controller.row(index).await;
            Ok(row.map(|row| format_row(index, &row)).unwrap_or_default())
        }

        RosterCommands::Add { name, mail, password, confirm, comment, experiences } => {
            let mut draft = User::new(name, mail, password).with_comment(comment);
            draft.experiences = experiences.into_iter().map(Reference::Id).collect();

            let outcome = controller.submit(draft, confirm).await?;
            Ok(format_outcome(&outcome))
        }

        RosterCommands::Edit { index, name, mail, password, confirm, comment } => {
            controller.begin_edit(index).await?;
            controller
                .edit_staging(|form| {
                    if let Some(name) = name {
                        form.draft.name = name;
                    }
                    if let Some(mail) = mail {
                        form.draft.mail = mail;
                    }
                    if let Some(comment) = comment {
                        form.draft.comment = comment;
                    }
                    if let Some(password) = password {
                        form.draft.password = password;
                    }
                    form.confirm_secret = confirm.unwrap_or_else(|| form.draft.password.clone());
                })
                .await;

            let outcome = controller.submit_staged().await?;
            Ok(format_outcome(&outcome))
        }

        RosterCommands::Remove { index } => {
            let name = controller.row(index).await.map(|row| row.user.name);
            if controller.remove(index).await? {
                info!(index, "user removed");
                Ok(format!("Removed {}", name.unwrap_or_default()))
            } else {
                Ok("Nothing removed".to_string())
            }
        }

        RosterCommands::Experiences { index } => {
            let found = controller.load_experiences(index).await?;
            Ok(format_experiences(&found))
        }
    }
}

fn format_outcome(outcome: &Submitted) -> String {
    match outcome {
        Submitted::Created(key) => format!("Created user {}", key),
        Submitted::Updated(key) => format!("Updated user {}", key),
    }
}

fn format_list(rows: &[RosterRow]) -> String {
    if rows.is_empty() {
        return "No users".to_string();
    }

    let mut output = String::new();
    for (index, row) in rows.iter().enumerate() {
        output.push_str(&format!(
            "{:>3}  {:<24} {:<32} {} experience(s)\n",
            index,
            row.user.name,
            row.user.mail,
            row.user.experiences.len()
        ));
    }
    output
}

fn format_row(index: usize, row: &RosterRow) -> String {
    let mut output = String::new();
    output.push_str(&format!("User #{}\n", index));
    output.push_str("========\n\n");
    output.push_str(&format!("Id:        {}\n", row.user.id.as_deref().unwrap_or("(not registered)")));
    output.push_str(&format!("Name:      {}\n", row.user.name));
    output.push_str(&format!("Mail:      {}\n", row.user.mail));

    let password = if row.state.password_visible {
        row.user.password.clone()
    } else {
        "*".repeat(row.user.password.chars().count().min(8))
    };
    output.push_str(&format!("Password:  {}\n", password));

    if row.state.biography_expanded && !row.user.comment.is_empty() {
        output.push_str(&format!("\n{}\n", row.user.comment));
    }

    if row.state.expanded {
        output.push_str("\nExperiences:\n");
        match &row.state.experiences {
            Some(found) => output.push_str(&format_experiences(found)),
            None => {
                for reference in &row.user.experiences {
                    match reference {
                        Reference::Resolved(exp) => output.push_str(&format_experience(exp)),
                        Reference::Id(id) => output.push_str(&format!("  - {} (unresolved)\n", id)),
                    }
                }
            }
        }
    }

    output
}

fn format_experiences(found: &[Experience]) -> String {
    if found.is_empty() {
        return "  (none)\n".to_string();
    }
    found.iter().map(format_experience).collect()
}

fn format_experience(exp: &Experience) -> String {
    format!(
        "  - [{}] {}\n",
        exp.id.as_deref().unwrap_or("?"),
        exp.description
    )
}
