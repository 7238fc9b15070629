use crate::error::Error;
use crate::netif::Interface;
use hickory_proto::op::{self, Message, MessageType, OpCode};
use hickory_proto::rr::{DNSClass, Name, RecordType};

/// Build the question set for browsing: one PTR question per type
///
/// The same message is sent on every interface. Known-answer
/// suppression (RFC 6762 s7.1) is not done, so the answer section is
/// always empty.
#[must_use]
pub fn browse_message(service_types: &[Name]) -> Message {
    let mut m = Message::new();
    m.set_id(0)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(false);
    for t in service_types {
        let mut q = op::Query::query(t.clone(), RecordType::PTR);
        q.set_query_class(DNSClass::IN);
        m.add_query(q);
    }
    m
}

/// An outgoing question, bound to one network interface
#[derive(Debug, Clone)]
pub struct Query {
    message: Message,
    interface: Interface,
}

impl Query {
    /// Bind a question set to an interface
    #[must_use]
    pub fn new(message: Message, interface: Interface) -> Self {
        Self { message, interface }
    }

    /// The question set
    #[must_use]
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The interface this query is to be sent on
    #[must_use]
    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    /// Name of the interface this query is to be sent on
    #[must_use]
    pub fn interface_name(&self) -> &str {
        &self.interface.name
    }

    /// Wire-format encoding of the message
    ///
    /// # Errors
    ///
    /// Returns `Error::Encode` if hickory-proto can't encode the message.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        self.message.to_vec().map_err(Error::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netif::{make_index, Flags};

    fn types() -> Vec<Name> {
        vec![
            Name::from_ascii("_http._tcp.local.").unwrap(),
            Name::from_ascii("_ipp._tcp.local.").unwrap(),
        ]
    }

    fn eth0() -> Interface {
        Interface {
            index: make_index(2),
            name: "eth0".to_string(),
            addrs: vec!["192.168.1.2".parse().unwrap()],
            flags: Flags::UP | Flags::RUNNING | Flags::MULTICAST,
        }
    }

    #[test]
    fn one_ptr_question_per_type() {
        let m = browse_message(&types());
        assert_eq!(m.message_type(), MessageType::Query);
        assert_eq!(m.id(), 0);
        assert_eq!(m.queries().len(), 2);
        for (q, t) in m.queries().iter().zip(types()) {
            assert_eq!(q.name(), &t);
            assert_eq!(q.query_type(), RecordType::PTR);
            assert_eq!(q.query_class(), DNSClass::IN);
        }
        assert!(m.answers().is_empty());
    }

    #[test]
    fn same_message_on_every_interface() {
        let m = browse_message(&types());
        let mut lo = eth0();
        lo.name = "lo".to_string();
        let q1 = Query::new(m.clone(), eth0());
        let q2 = Query::new(m, lo);
        assert_eq!(q1.to_bytes().unwrap(), q2.to_bytes().unwrap());
        assert_eq!(q1.interface_name(), "eth0");
        assert_eq!(q2.interface_name(), "lo");
    }

    #[test]
    fn encoding_parses_back() {
        let q = Query::new(browse_message(&types()), eth0());
        let m = Message::from_vec(&q.to_bytes().unwrap()).unwrap();
        assert_eq!(m.queries(), q.message().queries());
    }
}
