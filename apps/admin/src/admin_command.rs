use std::str::FromStr;

use gatehouse_application::AuditStreamQuery;
use gatehouse_core::{AppError, AppResult, PrincipalId};
use gatehouse_domain::{Action, ResourceKind, ResourceRef};

pub const USAGE: &str = "usage: gatehouse-admin <command>

commands:
  migrate                                          apply database migrations
  bootstrap <principal>                            grant global system to the first principal
  check <principal> <action> <resource> [id]       evaluate one permission and print the decision
  export-audit [after_sequence] [limit]            print audit records as JSON lines
  verify-audit                                     verify the audit hash chain";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Migrate,
    Bootstrap {
        principal: PrincipalId,
    },
    Check {
        principal: PrincipalId,
        action: Action,
        resource: ResourceRef,
    },
    ExportAudit {
        query: AuditStreamQuery,
    },
    VerifyAudit,
}

impl AdminCommand {
    pub fn parse(args: &[String]) -> AppResult<Self> {
        let Some((command, rest)) = args.split_first() else {
            return Err(usage_error("missing command"));
        };

        match (command.as_str(), rest) {
            ("migrate", []) => Ok(Self::Migrate),
            ("bootstrap", [principal]) => Ok(Self::Bootstrap {
                principal: PrincipalId::new(principal.as_str())?,
            }),
            ("check", [principal, action, resource, resource_id @ ..])
                if resource_id.len() <= 1 =>
            {
                let kind = ResourceKind::from_str(resource)?;
                Ok(Self::Check {
                    principal: PrincipalId::new(principal.as_str())?,
                    action: Action::from_str(action)?,
                    resource: match resource_id.first() {
                        Some(id) => ResourceRef::new(kind, id.as_str()),
                        None => ResourceRef::kind_only(kind),
                    },
                })
            }
            ("export-audit", bounds) if bounds.len() <= 2 => {
                let defaults = AuditStreamQuery::default();
                let after_sequence = bounds
                    .first()
                    .map(|value| parse_number::<i64>("after_sequence", value))
                    .transpose()?
                    .unwrap_or(defaults.after_sequence);
                let limit = bounds
                    .get(1)
                    .map(|value| parse_number::<usize>("limit", value))
                    .transpose()?
                    .unwrap_or(defaults.limit);

                Ok(Self::ExportAudit {
                    query: AuditStreamQuery {
                        after_sequence,
                        limit,
                        ..defaults
                    },
                })
            }
            ("verify-audit", []) => Ok(Self::VerifyAudit),
            (other, _) => Err(usage_error(&format!(
                "unknown command or wrong arguments for '{other}'"
            ))),
        }
    }
}

fn parse_number<T>(name: &str, value: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|error| AppError::Validation(format!("invalid {name} value '{value}': {error}")))
}

fn usage_error(message: &str) -> AppError {
    AppError::Validation(format!("{message}\n\n{USAGE}"))
}
