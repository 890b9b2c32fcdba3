use crate::account::{AccountId, IdentityOperations, StsClient};
use crate::admin::{DataAccessFilter, DataMeshAdmin};
use crate::config::MeshConfig;
use crate::consumer::{AccessRequest, DataMeshConsumer};
use crate::context::AwsContext;
use crate::error::MeshError;
use crate::iam::IamClient;
use crate::lakeformation::{parse_permission, DataResource, LakeFormationClient, PermissionGrant};
use crate::tracker::SubscriberTracker;
use anyhow::Result;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use tracing::error;

/// Runs the interactive data mesh prompt.
///
/// The supported commands are:
/// - identity: Show the caller identity
/// - initialize: Bootstrap the current account as the data mesh account
/// - enable_producer: Let an account assume the producer admin role
/// - enable_consumer: Let an account assume the consumer admin role
/// - grant / revoke: Change Lake Formation permissions for a principal
/// - list_data_access: List granted data access
/// - request_access: Request access to a producer's tables
/// - get_subscription: Fetch a subscription by id
/// - list_subscriptions: List subscriptions, optionally for one owner
/// - exit: Exit the program
///
/// A failing command is reported and the prompt continues.
pub async fn run(ctx: &AwsContext, config: &MeshConfig) -> Result<()> {
    let admin = DataMeshAdmin::from_context(ctx, config.clone());

    loop {
        let Some(command) = read_prompt(
            &mut io::stdin().lock(),
            &mut io::stdout(),
            "Enter command (identity/initialize/enable_producer/enable_consumer/grant/revoke/list_data_access/request_access/get_subscription/list_subscriptions/exit)",
            None,
        )?
        else {
            println!();
            break;
        };
        let result = match command.as_str() {
            "identity" => show_identity(ctx).await,
            "initialize" => initialize(&admin).await,
            "enable_producer" => enable_producer(&admin).await,
            "enable_consumer" => enable_consumer(&admin).await,
            "grant" => change_permissions(ctx, true).await,
            "revoke" => change_permissions(ctx, false).await,
            "list_data_access" => list_data_access(&admin).await,
            "request_access" => request_access(ctx, config).await,
            "get_subscription" => get_subscription(ctx, config).await,
            "list_subscriptions" => list_subscriptions(ctx).await,
            "exit" => break,
            _ => {
                println!("Unknown command. Please try again.");
                Ok(())
            }
        };
        match result {
            Err(e) if is_end_of_input(&e) => break,
            Err(e) => error!("{} failed: {:#}", command, e),
            Ok(()) => {}
        }
    }
    Ok(())
}

type Admin = DataMeshAdmin<StsClient, IamClient, LakeFormationClient, SubscriberTracker>;
type Consumer = DataMeshConsumer<LakeFormationClient, SubscriberTracker>;

async fn show_identity(ctx: &AwsContext) -> Result<()> {
    let identity = ctx.sts_client().caller_identity().await?;
    println!("Account: {}", identity.account);
    println!("Arn:     {}", identity.arn);
    println!("UserId:  {}", identity.user_id);
    Ok(())
}

async fn initialize(admin: &Admin) -> Result<()> {
    let confirmation = prompt_bool(
        "This replaces the Lake Formation administrators of this account. Continue?",
        false,
    )?;
    if !confirmation {
        println!("Initialization cancelled.");
        return Ok(());
    }

    let setup = admin.initialize_mesh_account().await?;
    print_json("Data Mesh Account", &setup)
}

async fn enable_producer(admin: &Admin) -> Result<()> {
    let account_id = prompt("Enter producer account id", Some("123456789012"))?;
    admin.enable_account_as_producer(&account_id).await?;
    println!("Account {} can now act as a producer.", account_id);
    Ok(())
}

async fn enable_consumer(admin: &Admin) -> Result<()> {
    let account_id = prompt("Enter consumer account id", Some("123456789012"))?;
    admin.enable_account_as_consumer(&account_id).await?;
    println!("Account {} can now act as a consumer.", account_id);
    Ok(())
}

async fn change_permissions(ctx: &AwsContext, grant: bool) -> Result<()> {
    let principal = prompt("Enter principal", Some("arn:aws:iam::123456789012:role/Analyst"))?;
    let resource: DataResource =
        prompt("Enter resource", Some("CATALOG, database or database.table"))?.parse()?;
    let permissions = prompt_list("Enter permissions", Some("SELECT,DESCRIBE"))?;
    let grantable = prompt_bool("With grant option?", false)?;

    let permissions = permissions
        .iter()
        .map(|p| parse_permission(p))
        .collect::<Result<Vec<_>, _>>()?;
    if permissions.is_empty() {
        return Err(MeshError::EmptyRequest("permission").into());
    }

    let request = permissions
        .into_iter()
        .fold(PermissionGrant::new(principal, resource), |request, permission| {
            if grantable {
                request.with_grant_option(permission)
            } else {
                request.permission(permission)
            }
        });

    let lake_formation = ctx.lake_formation_client();
    if grant {
        lake_formation.grant_permissions(&request).await
    } else {
        lake_formation.revoke_permissions(&request).await
    }
}

async fn list_data_access(admin: &Admin) -> Result<()> {
    let filter = DataAccessFilter {
        database_name: prompt_optional("Enter database name", None)?,
        table_name: prompt_optional("Enter table name", None)?,
        principal: prompt_optional("Enter principal", None)?,
        ..Default::default()
    };
    let grants = admin.list_data_access(&filter).await?;
    println!("\n--- Data Access ---");
    grants.iter().for_each(|grant| println!("{:?}", grant));
    println!("-------------------\n");
    Ok(())
}

async fn consumer(ctx: &AwsContext, config: &MeshConfig) -> Result<Consumer> {
    let mesh_account: AccountId = match &config.data_mesh_account_id {
        Some(account) => account.clone(),
        None => prompt("Enter data mesh account id", Some("123456789012"))?.parse()?,
    };
    Ok(DataMeshConsumer::from_context(ctx, &mesh_account).await)
}

async fn request_access(ctx: &AwsContext, config: &MeshConfig) -> Result<()> {
    let identity = ctx.sts_client().caller_identity().await?;
    let request = AccessRequest {
        owner_account_id: prompt("Enter owner (producer) account id", Some("123456789012"))?,
        database_name: prompt("Enter database name", Some("tpcds"))?,
        tables: prompt_list("Enter table names", Some("customer,orders"))?,
        permissions: prompt_list("Enter permissions", Some("SELECT,DESCRIBE"))?,
        requesting_principal: identity.account.to_string(),
    };

    let subscription = consumer(ctx, config)
        .await?
        .request_access_to_product(request)
        .await?;
    print_json("Subscription", &subscription)
}

async fn get_subscription(ctx: &AwsContext, config: &MeshConfig) -> Result<()> {
    let subscription_id = prompt("Enter subscription id", None)?;
    match consumer(ctx, config)
        .await?
        .get_subscription(&subscription_id)
        .await?
    {
        Some(subscription) => print_json("Subscription", &subscription)?,
        None => println!("Subscription not found"),
    }
    Ok(())
}

async fn list_subscriptions(ctx: &AwsContext) -> Result<()> {
    let owner = prompt_optional("Enter owner account id (or press Enter for all)", None)?
        .map(|o| o.parse::<AccountId>())
        .transpose()?;
    let subscriptions = ctx
        .subscriber_tracker()
        .list_subscriptions(owner.as_ref())
        .await?;
    print_json("Subscriptions", &subscriptions)
}

fn print_json<T: Serialize>(title: &str, value: &T) -> Result<()> {
    println!("\n--- {} ---", title);
    println!("{}", serde_json::to_string_pretty(value)?);
    println!("{}", "-".repeat(title.len() + 8));
    Ok(())
}

/// Writes the prompt to `output` and reads one line from `input`.
///
/// Returns `None` once `input` is exhausted.
fn read_prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    message: &str,
    example: Option<&str>,
) -> Result<Option<String>> {
    let full_message = if let Some(ex) = example {
        format!("{} (e.g., {}): ", message, ex)
    } else {
        format!("{}: ", message)
    };
    write!(output, "{}", full_message)?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Prompts on stdin, failing with [`MeshError::EndOfInput`] once it closes.
fn prompt(message: &str, example: Option<&str>) -> Result<String> {
    read_prompt(&mut io::stdin().lock(), &mut io::stdout(), message, example)?
        .ok_or_else(|| MeshError::EndOfInput.into())
}

fn is_end_of_input(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<MeshError>(), Some(MeshError::EndOfInput))
}

fn prompt_optional(message: &str, example: Option<&str>) -> Result<Option<String>> {
    let input = prompt(message, example)?;
    Ok(if input.is_empty() { None } else { Some(input) })
}

fn prompt_bool(message: &str, default: bool) -> Result<bool> {
    let input = prompt(
        &format!("{} (y/n)", message),
        Some(if default { "y" } else { "n" }),
    )?;
    Ok(input.to_lowercase().starts_with('y') || (input.is_empty() && default))
}

/// Comma separated values, empty entries dropped.
fn prompt_list(message: &str, example: Option<&str>) -> Result<Vec<String>> {
    Ok(split_list(&prompt(message, example)?))
}

fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("customer, orders,,"), vec!["customer", "orders"]);
        assert!(split_list("  ").is_empty());
    }

    fn read(input: &str, example: Option<&str>) -> (Option<String>, String) {
        let mut output = Vec::new();
        let line = read_prompt(
            &mut io::Cursor::new(input),
            &mut output,
            "Enter command",
            example,
        )
        .unwrap();
        (line, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_read_prompt_returns_trimmed_line() {
        let (line, output) = read("  initialize \nexit\n", Some("identity"));
        assert_eq!(line.as_deref(), Some("initialize"));
        assert_eq!(output, "Enter command (e.g., identity): ");

        // An empty line is still input
        let (line, _) = read("\n", None);
        assert_eq!(line.as_deref(), Some(""));
    }

    #[test]
    fn test_read_prompt_reports_closed_input() {
        let (line, output) = read("", None);
        assert_eq!(line, None);
        assert_eq!(output, "Enter command: ");
    }

    #[test]
    fn test_closed_input_stops_the_prompt_loop() {
        let mut input = io::Cursor::new("exit");
        let mut sink = Vec::new();
        assert!(read_prompt(&mut input, &mut sink, "a", None).unwrap().is_some());
        assert!(read_prompt(&mut input, &mut sink, "b", None).unwrap().is_none());

        assert!(is_end_of_input(&MeshError::EndOfInput.into()));
        let wrapped = anyhow::Error::from(MeshError::EndOfInput).context("grant");
        assert!(is_end_of_input(&wrapped));
        assert!(!is_end_of_input(&MeshError::MissingRegion.into()));
    }
}
