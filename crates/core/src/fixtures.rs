//! Demo business data backing the local lookup tools.

use crate::domain::client::{Client, ClientId};
use crate::domain::course::{Course, CourseId};
use crate::domain::order::{Order, OrderId, OrderStatus, PaymentStatus};

/// Read-only snapshot of clients, orders and courses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SupportCatalog {
    clients: Vec<Client>,
    orders: Vec<Order>,
    courses: Vec<Course>,
}

impl SupportCatalog {
    pub fn new(clients: Vec<Client>, orders: Vec<Order>, courses: Vec<Course>) -> Self {
        Self { clients, orders, courses }
    }

    pub fn demo() -> Self {
        Self::new(demo_clients(), demo_orders(), demo_courses())
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn find_order(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| &order.id == order_id)
    }

    pub fn find_client(&self, client_id: &ClientId) -> Option<&Client> {
        self.clients.iter().find(|client| &client.id == client_id)
    }

    /// First course whose name contains `query`, ignoring case.
    pub fn find_course(&self, query: &str) -> Option<&Course> {
        self.courses.iter().find(|course| course.matches(query))
    }
}

fn demo_clients() -> Vec<Client> {
    vec![
        client("C001", "Priya Sharma", "priya@example.com", "+91-9876543210", "Yoga Classes"),
        client("C002", "Amit Kumar", "amit@example.com", "+91-9876543211", "Fitness Training"),
        client("C003", "John Doe", "john@example.com", "+91-9876543212", "Wellness Consultation"),
    ]
}

fn client(id: &str, name: &str, email: &str, phone: &str, service: &str) -> Client {
    Client {
        id: ClientId(id.to_string()),
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        enrolled_services: vec![service.to_string()],
        status: "Active".to_string(),
    }
}

fn demo_orders() -> Vec<Order> {
    vec![
        Order {
            id: OrderId("ORD001".to_string()),
            client_id: ClientId("C001".to_string()),
            service: "Yoga Classes".to_string(),
            amount: 2000,
            status: OrderStatus::Paid,
            payment_status: PaymentStatus::Completed,
            date: "2025-07-01".to_string(),
        },
        Order {
            id: OrderId("ORD002".to_string()),
            client_id: ClientId("C002".to_string()),
            service: "Fitness Training".to_string(),
            amount: 3000,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            date: "2025-07-02".to_string(),
        },
        Order {
            id: OrderId("ORD003".to_string()),
            client_id: ClientId("C003".to_string()),
            service: "Wellness Consultation".to_string(),
            amount: 1500,
            status: OrderStatus::Paid,
            payment_status: PaymentStatus::Completed,
            date: "2025-07-03".to_string(),
        },
    ]
}

fn demo_courses() -> Vec<Course> {
    vec![
        Course {
            id: CourseId("YOGA001".to_string()),
            name: "Yoga Classes".to_string(),
            instructor: "Priya Instructor".to_string(),
            schedule: "Monday, Wednesday, Friday - 9:00 AM to 10:00 AM".to_string(),
            availability: "Available".to_string(),
            price: 2000,
            duration: "1 month".to_string(),
        },
        Course {
            id: CourseId("FITNESS001".to_string()),
            name: "Fitness Training".to_string(),
            instructor: "Amit Trainer".to_string(),
            schedule: "Tuesday, Thursday, Saturday - 6:00 PM to 7:00 PM".to_string(),
            availability: "Available".to_string(),
            price: 3000,
            duration: "1 month".to_string(),
        },
        Course {
            id: CourseId("WELLNESS001".to_string()),
            name: "Wellness Consultation".to_string(),
            instructor: "Dr. Wellness".to_string(),
            schedule: "By appointment - Monday to Friday".to_string(),
            availability: "Available".to_string(),
            price: 1500,
            duration: "1 session".to_string(),
        },
    ]
}
