use std::time::Instant;

use rmcp::{
    RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, ErrorCode, Implementation, ListToolsResult,
        PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use tracing::{debug, info, warn};

use crate::{
    errors::McpError,
    graphql::Client,
    tools::{
        add_thread_note::{ADD_THREAD_NOTE_TOOL_NAME, AddThreadNote},
        analyze_thread_patterns::{ANALYZE_THREAD_PATTERNS_TOOL_NAME, AnalyzeThreadPatterns},
        convert_arguments,
        fetch_threads::{FETCH_THREADS_TOOL_NAME, FetchThreads},
        get_customer_info::{GET_CUSTOMER_INFO_TOOL_NAME, GetCustomerInfo},
        get_thread_details::{GET_THREAD_DETAILS_TOOL_NAME, GetThreadDetails},
        search_threads::{SEARCH_THREADS_TOOL_NAME, SearchThreads},
        update_thread_status::{UPDATE_THREAD_STATUS_TOOL_NAME, UpdateThreadStatus},
    },
};

const INSTRUCTIONS: &str = "Tools for working with Plain customer support threads. \
Use fetch_threads or search_threads to find threads, get_thread_details and get_customer_info \
to read them, update_thread_status and add_thread_note to act on them, and \
analyze_thread_patterns to find related issues.";

#[derive(Clone)]
pub(super) struct Running {
    client: Client,
    fetch_threads: FetchThreads,
    search_threads: SearchThreads,
    get_thread_details: GetThreadDetails,
    update_thread_status: UpdateThreadStatus,
    add_thread_note: AddThreadNote,
    get_customer_info: GetCustomerInfo,
    analyze_thread_patterns: AnalyzeThreadPatterns,
}

impl Running {
    pub(super) fn new(client: Client) -> Self {
        Self {
            client,
            fetch_threads: Default::default(),
            search_threads: Default::default(),
            get_thread_details: Default::default(),
            update_thread_status: Default::default(),
            add_thread_note: Default::default(),
            get_customer_info: Default::default(),
            analyze_thread_patterns: Default::default(),
        }
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            self.fetch_threads.tool.clone(),
            self.search_threads.tool.clone(),
            self.get_thread_details.tool.clone(),
            self.update_thread_status.tool.clone(),
            self.add_thread_note.tool.clone(),
            self.get_customer_info.tool.clone(),
            self.analyze_thread_patterns.tool.clone(),
        ]
    }

    /// Route a tool call to the tool with the requested name
    async fn dispatch(&self, request: CallToolRequestParam) -> Result<CallToolResult, McpError> {
        let client = &self.client;
        let arguments = request.arguments;
        match request.name.as_ref() {
            FETCH_THREADS_TOOL_NAME => {
                self.fetch_threads
                    .execute(client, convert_arguments(arguments)?)
                    .await
            }
            SEARCH_THREADS_TOOL_NAME => {
                self.search_threads
                    .execute(client, convert_arguments(arguments)?)
                    .await
            }
            GET_THREAD_DETAILS_TOOL_NAME => {
                self.get_thread_details
                    .execute(client, convert_arguments(arguments)?)
                    .await
            }
            UPDATE_THREAD_STATUS_TOOL_NAME => {
                self.update_thread_status
                    .execute(client, convert_arguments(arguments)?)
                    .await
            }
            ADD_THREAD_NOTE_TOOL_NAME => {
                self.add_thread_note
                    .execute(client, convert_arguments(arguments)?)
                    .await
            }
            GET_CUSTOMER_INFO_TOOL_NAME => {
                self.get_customer_info
                    .execute(client, convert_arguments(arguments)?)
                    .await
            }
            ANALYZE_THREAD_PATTERNS_TOOL_NAME => {
                self.analyze_thread_patterns
                    .execute(client, convert_arguments(arguments)?)
                    .await
            }
            name => Err(tool_not_found(name)),
        }
    }
}

impl ServerHandler for Running {
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool = request.name.clone();
        let started = Instant::now();
        debug!(%tool, "Calling tool");

        let result = self.dispatch(request).await;
        let elapsed = started.elapsed();
        match &result {
            Ok(result) if result.is_error == Some(true) => {
                warn!(%tool, ?elapsed, "Tool call returned an error result")
            }
            Ok(_) => info!(%tool, ?elapsed, "Tool call succeeded"),
            Err(e) => warn!(%tool, ?elapsed, error = %e.message, "Tool call rejected"),
        }
        result
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            next_cursor: None,
            tools: self.tools(),
        })
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }
}

fn tool_not_found(name: &str) -> McpError {
    McpError::new(
        ErrorCode::METHOD_NOT_FOUND,
        format!("Tool {name} not found"),
        None,
    )
}
