use std::net::SocketAddr;
use std::sync::Arc;

use rmcp::{
    RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    service::RequestContext,
    tool, tool_handler, tool_router,
};

use crate::config::{Config, TransportMode};
use crate::core::{
    api::{ApiConnector, HttpConnector},
    client::TimeCampClient,
    credentials::resolve_credential,
    error::{McpResult, TimeCampError, TimeCampResult},
    models::{
        AddTimeEntryRequest, DeleteTimeEntryRequest, EntryChanges, Envelope,
        GetTimeEntriesRequest, UpdateTimeEntryRequest, Validate,
    },
};

const ADD_FAILURE: &str = "Error adding time entry";
const LIST_FAILURE: &str = "Error fetching time entries";
const TASKS_FAILURE: &str = "Error fetching tasks";
const DELETE_FAILURE: &str = "Error deleting time entry";
const UPDATE_FAILURE: &str = "Error updating time entry";

/// Authorization header of the inbound HTTP request, if the call came over HTTP
fn authorization_header(ctx: &RequestContext<RoleServer>) -> Option<String> {
    ctx.extensions
        .get::<axum::http::request::Parts>()
        .and_then(|parts| parts.headers.get(axum::http::header::AUTHORIZATION))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// TimeCamp MCP Server exposing time entries and tasks as tools
#[derive(Clone)]
pub struct TimeCampService {
    connector: Arc<dyn ApiConnector>,
    default_token: Option<String>,
    base_url: String,
    transport: TransportMode,
    tool_router: ToolRouter<TimeCampService>,
}

impl TimeCampService {
    pub fn new(config: &Config) -> TimeCampResult<Self> {
        let connector = HttpConnector::new(&config.base_url, config.timeout)?;
        Ok(Self::with_connector(Arc::new(connector), config))
    }

    pub fn with_connector(connector: Arc<dyn ApiConnector>, config: &Config) -> Self {
        Self {
            connector,
            default_token: config.api_token.clone(),
            base_url: config.base_url.clone(),
            transport: config.transport,
            tool_router: Self::tool_router(),
        }
    }

    /// Build a client for one call; nothing credential-bound outlives the call
    pub(crate) fn client_for(&self, authorization: Option<&str>) -> TimeCampResult<TimeCampClient> {
        let token = resolve_credential(authorization, self.default_token.as_deref())?;
        Ok(TimeCampClient::new(self.connector.connect(&token)?))
    }

    fn rejected(err: TimeCampError, failure_prefix: &str) -> CallToolResult {
        Envelope::failure(&err).render(failure_prefix)
    }

    pub(crate) async fn add_entry(
        &self,
        authorization: Option<&str>,
        req: AddTimeEntryRequest,
    ) -> McpResult<CallToolResult> {
        let client = self.client_for(authorization)?;
        if let Err(e) = req.validate() {
            return Ok(Self::rejected(e, ADD_FAILURE));
        }

        let envelope = client
            .create_entry(req.from(), req.to(), req.note(), *req.task_id())
            .await;
        Ok(envelope.render(ADD_FAILURE))
    }

    pub(crate) async fn list_entries(
        &self,
        authorization: Option<&str>,
        req: GetTimeEntriesRequest,
    ) -> McpResult<CallToolResult> {
        let client = self.client_for(authorization)?;
        if let Err(e) = req.validate() {
            return Ok(Self::rejected(e, LIST_FAILURE));
        }

        Ok(client
            .list_entries(req.from(), req.to())
            .await
            .render(LIST_FAILURE))
    }

    pub(crate) async fn list_tasks(&self, authorization: Option<&str>) -> McpResult<CallToolResult> {
        let client = self.client_for(authorization)?;
        Ok(client.list_tasks().await.render(TASKS_FAILURE))
    }

    pub(crate) async fn delete_entry(
        &self,
        authorization: Option<&str>,
        req: DeleteTimeEntryRequest,
    ) -> McpResult<CallToolResult> {
        let client = self.client_for(authorization)?;
        if let Err(e) = req.validate() {
            return Ok(Self::rejected(e, DELETE_FAILURE));
        }

        Ok(client
            .delete_entry(req.entry_id())
            .await
            .render(DELETE_FAILURE))
    }

    pub(crate) async fn update_entry(
        &self,
        authorization: Option<&str>,
        req: UpdateTimeEntryRequest,
    ) -> McpResult<CallToolResult> {
        let client = self.client_for(authorization)?;
        if let Err(e) = req.validate() {
            return Ok(Self::rejected(e, UPDATE_FAILURE));
        }

        let changes = EntryChanges::from(&req);
        Ok(client
            .update_entry(req.entry_id(), &changes)
            .await
            .render(UPDATE_FAILURE))
    }

    fn create_resource_text(&self, uri: &str, name: &str) -> Resource {
        RawResource::new(uri, name.to_string()).no_annotation()
    }

    fn generate_status_content(&self) -> String {
        format!(
            r#"TimeCamp MCP Server Status

Server: Running
Transport: {:?}
TimeCamp API: {}
Default API Token: {}
Tools Available: 5
Resources Available: 2

Credential Resolution:
- Authorization header of the HTTP request (HTTP transport only)
- Default API token from --api-token / TIMECAMP_API_TOKEN"#,
            self.transport,
            self.base_url,
            if self.default_token.is_some() {
                "configured"
            } else {
                "not configured"
            }
        )
    }

    fn generate_help_content(&self) -> &'static str {
        r#"TimeCamp MCP Server Help

TOOLS:
- add_timecamp_time_entry: Log a new time entry
  - from: Start as 'YYYY-MM-DD HH:MM' (required)
  - to: End as 'YYYY-MM-DD HH:MM' (required)
  - note: Description of the work (required)
  - task_id: TimeCamp task id (optional)
  - Example: {"from": "2025-06-21 09:00", "to": "2025-06-21 09:43", "note": "emails & org"}

- get_timecamp_time_entries: List time entries in a date range
  - from: First day as 'YYYY-MM-DD' (required)
  - to: Last day as 'YYYY-MM-DD' (required)
  - Example: {"from": "2025-06-01", "to": "2025-06-30"}

- get_timecamp_tasks: List active (non-archived) tasks
  - No parameters required

- update_timecamp_time_entry: Change an existing entry; omitted fields stay unchanged
  - entryId: Entry id (required)
  - from: New start as 'HH:MM' (optional)
  - to: New end as 'HH:MM' (optional)
  - note: New description (optional)
  - task_id: New task id (optional)
  - Example: {"entryId": "12345", "from": "09:15"}

- delete_timecamp_time_entry: Delete an entry
  - entryId: Entry id (required)
  - Example: {"entryId": "12345"}

RESOURCES:
- timecamp://status: Current server status and configuration
- timecamp://help: This help documentation

TIME FORMATS:
- New entries take full 'YYYY-MM-DD HH:MM' values and may span midnight
- Updates take 'HH:MM' only and must stay within one day
- When only one of from/to is given, the other side is read from the existing entry
  (entries from the last 30 days)"#
    }
}

#[tool_router]
impl TimeCampService {
    #[tool(
        name = "add_timecamp_time_entry",
        description = "Add a time entry to TimeCamp. 'from' and 'to' are 'YYYY-MM-DD HH:MM'; the duration is computed from them and must be positive."
    )]
    async fn add_timecamp_time_entry(
        &self,
        Parameters(req): Parameters<AddTimeEntryRequest>,
        ctx: RequestContext<RoleServer>,
    ) -> McpResult<CallToolResult> {
        self.add_entry(authorization_header(&ctx).as_deref(), req)
            .await
    }

    #[tool(
        name = "get_timecamp_time_entries",
        description = "Get TimeCamp time entries between two dates ('YYYY-MM-DD'), with task names, notes and durations in seconds and hours."
    )]
    async fn get_timecamp_time_entries(
        &self,
        Parameters(req): Parameters<GetTimeEntriesRequest>,
        ctx: RequestContext<RoleServer>,
    ) -> McpResult<CallToolResult> {
        self.list_entries(authorization_header(&ctx).as_deref(), req)
            .await
    }

    #[tool(
        name = "get_timecamp_tasks",
        description = "Get the active (non-archived) TimeCamp tasks and projects with their ids, parents and levels."
    )]
    async fn get_timecamp_tasks(&self, ctx: RequestContext<RoleServer>) -> McpResult<CallToolResult> {
        self.list_tasks(authorization_header(&ctx).as_deref()).await
    }

    #[tool(
        name = "delete_timecamp_time_entry",
        description = "Delete a TimeCamp time entry by id."
    )]
    async fn delete_timecamp_time_entry(
        &self,
        Parameters(req): Parameters<DeleteTimeEntryRequest>,
        ctx: RequestContext<RoleServer>,
    ) -> McpResult<CallToolResult> {
        self.delete_entry(authorization_header(&ctx).as_deref(), req)
            .await
    }

    #[tool(
        name = "update_timecamp_time_entry",
        description = "Update a TimeCamp time entry. Only the given fields change; 'from'/'to' are 'HH:MM' on the entry's day. If only one of them is given, the other is taken from the existing entry."
    )]
    async fn update_timecamp_time_entry(
        &self,
        Parameters(req): Parameters<UpdateTimeEntryRequest>,
        ctx: RequestContext<RoleServer>,
    ) -> McpResult<CallToolResult> {
        self.update_entry(authorization_header(&ctx).as_deref(), req)
            .await
    }
}

#[tool_handler]
impl ServerHandler for TimeCampService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some("TimeCamp MCP Server for time tracking. Tools: add_timecamp_time_entry, get_timecamp_time_entries, get_timecamp_tasks, update_timecamp_time_entry, delete_timecamp_time_entry. Dates are 'YYYY-MM-DD', new entries take 'YYYY-MM-DD HH:MM', updates take 'HH:MM'. Resources: timecamp://status, timecamp://help.".to_string()),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> McpResult<ListResourcesResult> {
        Ok(ListResourcesResult {
            resources: vec![
                self.create_resource_text("timecamp://status", "server-status"),
                self.create_resource_text("timecamp://help", "help-documentation"),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _: RequestContext<RoleServer>,
    ) -> McpResult<ReadResourceResult> {
        match uri.as_str() {
            "timecamp://status" => {
                let status = self.generate_status_content();
                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(status, uri)],
                })
            }
            "timecamp://help" => Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(self.generate_help_content(), uri)],
            }),
            _ => Err(TimeCampError::ResourceNotFound {
                uri: uri.to_string(),
            }
            .into()),
        }
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> McpResult<ListResourceTemplatesResult> {
        Ok(ListResourceTemplatesResult {
            next_cursor: None,
            resource_templates: Vec::new(),
        })
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> McpResult<InitializeResult> {
        tracing::info!("TimeCamp MCP Server initialized successfully");
        Ok(self.get_info())
    }
}

async fn serve_stdio(service: TimeCampService) -> Result<(), Box<dyn std::error::Error>> {
    use rmcp::{ServiceExt, transport::stdio};

    let service = service.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("serving error: {:?}", e);
    })?;

    service.waiting().await?;
    Ok(())
}

/// `/mcp` endpoint; each POST is served on its own, so no session outlives a call
fn http_router(service: TimeCampService) -> axum::Router {
    use rmcp::transport::streamable_http_server::{
        StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
    };

    let mcp = StreamableHttpService::new(
        move || Ok(service.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            stateful_mode: false,
            ..Default::default()
        },
    );
    axum::Router::new().nest_service("/mcp", mcp)
}

async fn serve_http(
    service: TimeCampService,
    bind: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("TimeCamp MCP server listening on http://{}/mcp", bind);

    axum::serve(listener, http_router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let service = TimeCampService::new(&config)?;

    match config.transport {
        TransportMode::Stdio => serve_stdio(service).await,
        TransportMode::Http => serve_http(service, config.bind).await,
    }
}
