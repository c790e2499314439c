use std::sync::Arc;

use async_std::future::timeout;
use async_std::task;

use crate::correlation::{self, CorrelationId};
use crate::error::Error;
use crate::message::{Method, Request, Response};
use crate::options::{CallOptions, Defaults};
use crate::transport::{ReplyScope, Transport};

/// Client makes blocking request/response calls over a publish/subscribe transport.
///
/// Each call provisions its own reply destination, subscribes a handler
/// matching only that call's correlation id, publishes the request and
/// then waits for the handler to observe the matching response.
/// Calls share nothing but the transport.
pub struct Client<T> {
    transport: Arc<T>,
    defaults: Defaults,
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Client {
            transport: self.transport.clone(),
            defaults: self.defaults.clone(),
        }
    }
}

impl<T> Client<T>
where
    T: Transport + 'static,
{
    /// Create a client over an already connected transport
    pub fn new(transport: T) -> Client<T> {
        Client {
            transport: Arc::new(transport),
            defaults: Defaults::default(),
        }
    }

    /// Connect the transport and create a client using default settings
    pub fn connect(transport: T) -> Result<Client<T>, Error> {
        Self::connect_with(transport, Defaults::default())
    }

    /// Connect the transport and create a client with the provided defaults
    pub fn connect_with(transport: T, defaults: Defaults) -> Result<Client<T>, Error> {
        task::block_on(transport.connect())?;
        debug!("Client connected");

        Ok(Client {
            transport: Arc::new(transport),
            defaults,
        })
    }

    /// Disconnect the underlying transport
    pub fn disconnect(&self) -> Result<(), Error> {
        task::block_on(self.transport.disconnect())?;
        debug!("Client disconnected");
        Ok(())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Send a GET request and wait for the response
    pub fn get(&self, target: &str, path: &str, options: CallOptions) -> Result<Response, Error> {
        self.call(target, Method::Get, path, Vec::new(), options)
    }

    /// Send a POST request and wait for the response
    pub fn post<B: Into<Vec<u8>>>(
        &self, target: &str, path: &str, body: B, options: CallOptions,
    ) -> Result<Response, Error> {
        self.call(target, Method::Post, path, body, options)
    }

    /// Send a PUT request and wait for the response
    pub fn put<B: Into<Vec<u8>>>(
        &self, target: &str, path: &str, body: B, options: CallOptions,
    ) -> Result<Response, Error> {
        self.call(target, Method::Put, path, body, options)
    }

    /// Send a DELETE request and wait for the response
    pub fn delete(&self, target: &str, path: &str, options: CallOptions) -> Result<Response, Error> {
        self.call(target, Method::Delete, path, Vec::new(), options)
    }

    /// Send a request and block the calling thread until the response arrives.
    ///
    /// Without a timeout in the options this waits indefinitely.
    pub fn call<B: Into<Vec<u8>>>(
        &self, target: &str, method: Method, path: &str, body: B, options: CallOptions,
    ) -> Result<Response, Error> {
        task::block_on(self.request(target, method, path, body.into(), options))
    }

    /// Send a request and resolve once the matching response arrives.
    ///
    /// The reply destination is released when this future completes or is dropped.
    pub async fn request(
        &self, target: &str, method: Method, path: &str, body: Vec<u8>, options: CallOptions,
    ) -> Result<Response, Error> {
        if target.is_empty() {
            return Err(Error::InvalidTarget);
        }

        let id = CorrelationId::new();
        debug!("Request {} {} {} to '{}'", id, method, path, target);

        let scope = ReplyScope::open(&*self.transport).await?;

        // Subscribe before publishing so a fast reply cannot be missed
        let (pending, handler) = correlation::pending(id);
        self.transport.subscribe(scope.destination(), handler).await?;

        let request = self.build(id, scope.destination().name(), target, method, path, body, &options);
        self.transport.publish(request).await?;
        trace!("Published request {}, awaiting response", id);

        let resp = match options.timeout {
            Some(d) => match timeout(d, pending).await {
                Ok(r) => r,
                Err(_) => {
                    debug!("Request {} timed out after {:?}", id, d);
                    Err(Error::Timeout(d))
                }
            },
            None => pending.await,
        }?;

        debug!("Request {} resolved with status {:?}", id, resp.status);

        Ok(resp)
    }

    fn build(
        &self, id: CorrelationId, reply_to: &str, target: &str, method: Method, path: &str,
        body: Vec<u8>, options: &CallOptions,
    ) -> Request {
        Request {
            method,
            path: path.to_string(),
            body,
            headers: Request::merge_headers(&options.headers, method, path),
            routing_key: target.to_string(),
            priority: options.priority,
            content_type: options
                .content_type
                .clone()
                .unwrap_or_else(|| self.defaults.content_type.clone()),
            content_encoding: options
                .content_encoding
                .clone()
                .unwrap_or_else(|| self.defaults.content_encoding.clone()),
            timestamp: options.timestamp.unwrap_or_else(Defaults::timestamp),
            correlation_id: id,
            reply_to: reply_to.to_string(),
        }
    }
}
