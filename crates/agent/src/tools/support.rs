//! The customer-support tool set: backend client search, order status, course schedules,
//! service information and enquiry creation.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use frontdesk_core::config::ToolsConfig;
use frontdesk_core::{Course, Enquiry, EnquiryId, EnquiryStatus, OrderId, SupportCatalog};
use serde_json::Value;
use tracing::info;

use super::{
    ParamSpec, ParamType, RegistryError, ToolArguments, ToolFailure, ToolHandler, ToolRegistry,
    ToolSpec,
};

pub const SEARCH_CLIENT: &str = "search_client";
pub const CHECK_ORDER_STATUS: &str = "check_order_status";
pub const GET_COURSE_SCHEDULE: &str = "get_course_schedule";
pub const GET_SERVICE_INFO: &str = "get_service_info";
pub const CREATE_ENQUIRY: &str = "create_enquiry";

/// Builds the registry the support agent runs with.
pub fn support_registry(
    catalog: Arc<SupportCatalog>,
    config: &ToolsConfig,
    http: reqwest::Client,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new().with_call_timeout(config.timeout());

    registry.register(
        ToolSpec::new(
            SEARCH_CLIENT,
            "Search for a client by name, email, or phone.",
            ClientSearch::new(http, &config.backend_base_url, config.timeout()),
        )
        .param(ParamSpec::required("query", ParamType::String, "Name, email or phone to search")),
    )?;
    registry.register(
        ToolSpec::new(
            CHECK_ORDER_STATUS,
            "Check the status and payment information for a specific order ID.",
            OrderStatusLookup { catalog: Arc::clone(&catalog) },
        )
        .param(ParamSpec::required("order_id", ParamType::String, "Order ID, e.g. ORD001")),
    )?;
    registry.register(
        ToolSpec::new(
            GET_COURSE_SCHEDULE,
            "Get the schedule and availability for a specific service or all available services.",
            CourseSchedule { catalog: Arc::clone(&catalog) },
        )
        .param(ParamSpec::optional(
            "service_name",
            ParamType::String,
            "Service to look up; omit to list every service",
        )),
    )?;
    registry.register(
        ToolSpec::new(
            GET_SERVICE_INFO,
            "Get information about available services, pricing, and descriptions. Use this \
             tool when customers ask about services, pricing, or general information.",
            ServiceInfo { catalog },
        )
        .param(ParamSpec::optional(
            "service_type",
            ParamType::String,
            "Service to describe; omit to list every service",
        )),
    )?;
    registry.register(
        ToolSpec::new(
            CREATE_ENQUIRY,
            "Create a new customer enquiry. Use this tool when customers want to register \
             interest or ask questions about services.",
            EnquiryIntake,
        )
        .param(ParamSpec::required("name", ParamType::String, "Customer name"))
        .param(ParamSpec::required("email", ParamType::String, "Customer email"))
        .param(ParamSpec::required("phone", ParamType::String, "Customer phone"))
        .param(ParamSpec::required("service", ParamType::String, "Service of interest"))
        .param(ParamSpec::required("message", ParamType::String, "Enquiry text")),
    )?;

    Ok(registry)
}

fn string_arg<'a>(arguments: &'a ToolArguments, name: &str) -> Option<&'a str> {
    arguments.get(name).and_then(Value::as_str)
}

fn required_arg<'a>(arguments: &'a ToolArguments, name: &str) -> Result<&'a str, ToolFailure> {
    string_arg(arguments, name)
        .ok_or_else(|| ToolFailure::new(format!("missing required parameter `{name}`")))
}

/// Blank or absent filters fall back to listing everything.
fn filter_arg<'a>(arguments: &'a ToolArguments, name: &str) -> Option<&'a str> {
    string_arg(arguments, name).map(str::trim).filter(|value| !value.is_empty())
}

pub struct ClientSearch {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl ClientSearch {
    pub fn new(http: reqwest::Client, backend_base_url: &str, timeout: Duration) -> Self {
        Self {
            http,
            endpoint: format!("{}/agent1/clients/search/", backend_base_url.trim_end_matches('/')),
            timeout,
        }
    }

    async fn fetch(&self, query: &str) -> Result<Vec<Value>, reqwest::Error> {
        self.http
            .get(&self.endpoint)
            .query(&[("q", query)])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Value>>()
            .await
    }
}

#[async_trait]
impl ToolHandler for ClientSearch {
    async fn call(&self, arguments: &ToolArguments) -> Result<String, ToolFailure> {
        let query = required_arg(arguments, "query")?;
        let matches = self
            .fetch(query)
            .await
            .map_err(|error| ToolFailure::new(format!("Error contacting backend: {error}")))?;

        if matches.is_empty() {
            return Ok("No client found.".to_string());
        }
        serde_json::to_string_pretty(&matches)
            .map_err(|error| ToolFailure::new(format!("Error rendering clients: {error}")))
    }
}

pub struct OrderStatusLookup {
    catalog: Arc<SupportCatalog>,
}

#[async_trait]
impl ToolHandler for OrderStatusLookup {
    async fn call(&self, arguments: &ToolArguments) -> Result<String, ToolFailure> {
        let order_id = OrderId::normalized(required_arg(arguments, "order_id")?);
        let Some(order) = self.catalog.find_order(&order_id) else {
            return Ok(format!(
                "Order {} not found. Please check the order ID and try again.",
                order_id.0
            ));
        };
        let client_name = self
            .catalog
            .find_client(&order.client_id)
            .map_or("Unknown", |client| client.name.as_str());

        Ok(format!(
            "Order Details:\n- Order ID: {}\n- Client: {}\n- Service: {}\n- Amount: ₹{}\n\
             - Order Status: {}\n- Payment Status: {}\n- Date: {}",
            order.id.0,
            client_name,
            order.service,
            order.amount,
            order.status.label(),
            order.payment_status.label(),
            order.date
        ))
    }
}

pub struct CourseSchedule {
    catalog: Arc<SupportCatalog>,
}

#[async_trait]
impl ToolHandler for CourseSchedule {
    async fn call(&self, arguments: &ToolArguments) -> Result<String, ToolFailure> {
        if let Some(course) =
            filter_arg(arguments, "service_name").and_then(|query| self.catalog.find_course(query))
        {
            return Ok(format!(
                "Course Details:\n- Service: {}\n- Instructor: {}\n- Schedule: {}\n\
                 - Availability: {}\n- Price: ₹{}\n- Duration: {}",
                course.name,
                course.instructor,
                course.schedule,
                course.availability,
                course.price,
                course.duration
            ));
        }

        Ok(listing("Available Services and Schedules:", self.catalog.courses(), |out, course| {
            let _ = writeln!(out, "   Instructor: {}", course.instructor);
            let _ = writeln!(out, "   Schedule: {}", course.schedule);
            let _ = writeln!(out, "   Price: ₹{} ({})", course.price, course.duration);
            let _ = writeln!(out, "   Status: {}", course.availability);
        }))
    }
}

pub struct ServiceInfo {
    catalog: Arc<SupportCatalog>,
}

#[async_trait]
impl ToolHandler for ServiceInfo {
    async fn call(&self, arguments: &ToolArguments) -> Result<String, ToolFailure> {
        if let Some(course) =
            filter_arg(arguments, "service_type").and_then(|query| self.catalog.find_course(query))
        {
            return Ok(format!(
                "Service Information:\n- Service: {}\n- Price: ₹{}\n- Duration: {}\n\
                 - Instructor: {}\n- Availability: {}\n- Schedule: {}",
                course.name,
                course.price,
                course.duration,
                course.instructor,
                course.availability,
                course.schedule
            ));
        }

        Ok(listing("Our Services:", self.catalog.courses(), |out, course| {
            let _ = writeln!(out, "   Price: ₹{} ({})", course.price, course.duration);
            let _ = writeln!(out, "   Instructor: {}", course.instructor);
            let _ = writeln!(out, "   Availability: {}", course.availability);
        }))
    }
}

fn listing(heading: &str, courses: &[Course], detail: impl Fn(&mut String, &Course)) -> String {
    let mut out = format!("{heading}\n\n");
    for course in courses {
        let _ = writeln!(out, "- {}", course.name);
        detail(&mut out, course);
        out.push('\n');
    }
    out
}

/// Records an enquiry and returns the confirmation shown to the customer. Enquiries are not
/// persisted; the backend CRUD layer owns storage.
pub struct EnquiryIntake;

#[async_trait]
impl ToolHandler for EnquiryIntake {
    async fn call(&self, arguments: &ToolArguments) -> Result<String, ToolFailure> {
        let created_at = Utc::now();
        let enquiry = Enquiry {
            id: EnquiryId::at(created_at),
            name: required_arg(arguments, "name")?.to_string(),
            email: required_arg(arguments, "email")?.to_string(),
            phone: required_arg(arguments, "phone")?.to_string(),
            service: required_arg(arguments, "service")?.to_string(),
            message: required_arg(arguments, "message")?.to_string(),
            status: EnquiryStatus::New,
            created_at,
        };
        info!(
            event_name = "agent.enquiry.created",
            enquiry_id = %enquiry.id.0,
            service = %enquiry.service,
            "customer enquiry recorded"
        );

        Ok(format!(
            "Enquiry Created Successfully!\n- Enquiry ID: {}\n- Name: {}\n- Email: {}\n\
             - Phone: {}\n- Service Interest: {}\n- Message: {}\n- Status: New\n\n\
             Our team will contact you within 24 hours. Thank you for your interest!",
            enquiry.id.0,
            enquiry.name,
            enquiry.email,
            enquiry.phone,
            enquiry.service,
            enquiry.message
        ))
    }
}
