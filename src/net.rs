//! Transport abstractions generalizing the reactor's production transport
//! (`mio::net`) and the blocking helper transport used by tests and demo
//! clients (`std::net`) behind the same two traits.

use std::io::{Error, Result};
use std::net::{Shutdown, SocketAddr};

pub trait TcpStream {
    fn connect(addr: SocketAddr) -> Result<Self>
    where
        Self: Sized;

    fn peer_addr(&self) -> Result<SocketAddr>;

    fn local_addr(&self) -> Result<SocketAddr>;

    fn shutdown(&self, how: Shutdown) -> Result<()>;

    fn set_nodelay(&self, nodelay: bool) -> Result<()>;

    fn nodelay(&self) -> Result<bool>;

    fn set_ttl(&self, ttl: u32) -> Result<()>;

    fn ttl(&self) -> Result<u32>;

    fn take_error(&self) -> Result<Option<Error>>;

    fn peek(&self, buf: &mut [u8]) -> Result<usize>;
}

pub trait TcpListener<S: TcpStream> {
    fn bind(addr: SocketAddr) -> Result<Self>
    where
        Self: Sized;

    fn accept(&self) -> Result<(S, SocketAddr)>;

    fn local_addr(&self) -> Result<SocketAddr>;

    fn set_ttl(&self, ttl: u32) -> Result<()>;

    fn ttl(&self) -> Result<u32>;

    fn take_error(&self) -> Result<Option<Error>>;
}

macro_rules! impl_tcp_stream {
    ($ty:ty) => {
        impl TcpStream for $ty {
            #[inline]
            fn connect(addr: SocketAddr) -> Result<Self> {
                Self::connect(addr)
            }

            #[inline]
            fn peer_addr(&self) -> Result<SocketAddr> {
                Self::peer_addr(self)
            }

            #[inline]
            fn local_addr(&self) -> Result<SocketAddr> {
                Self::local_addr(self)
            }

            #[inline]
            fn shutdown(&self, how: Shutdown) -> Result<()> {
                Self::shutdown(self, how)
            }

            #[inline]
            fn set_nodelay(&self, nodelay: bool) -> Result<()> {
                Self::set_nodelay(self, nodelay)
            }

            #[inline]
            fn nodelay(&self) -> Result<bool> {
                Self::nodelay(self)
            }

            #[inline]
            fn set_ttl(&self, ttl: u32) -> Result<()> {
                Self::set_ttl(self, ttl)
            }

            #[inline]
            fn ttl(&self) -> Result<u32> {
                Self::ttl(self)
            }

            #[inline]
            fn take_error(&self) -> Result<Option<Error>> {
                Self::take_error(self)
            }

            #[inline]
            fn peek(&self, buf: &mut [u8]) -> Result<usize> {
                Self::peek(self, buf)
            }
        }
    };
}

impl_tcp_stream!(mio::net::TcpStream);
impl_tcp_stream!(std::net::TcpStream);

macro_rules! impl_tcp_listener {
    ($listener:ty, $stream:ty) => {
        impl TcpListener<$stream> for $listener {
            #[inline]
            fn bind(addr: SocketAddr) -> Result<Self> {
                Self::bind(addr)
            }

            #[inline]
            fn accept(&self) -> Result<($stream, SocketAddr)> {
                Self::accept(self)
            }

            #[inline]
            fn local_addr(&self) -> Result<SocketAddr> {
                Self::local_addr(self)
            }

            #[inline]
            fn set_ttl(&self, ttl: u32) -> Result<()> {
                Self::set_ttl(self, ttl)
            }

            #[inline]
            fn ttl(&self) -> Result<u32> {
                Self::ttl(self)
            }

            #[inline]
            fn take_error(&self) -> Result<Option<Error>> {
                Self::take_error(self)
            }
        }
    };
}

impl_tcp_listener!(mio::net::TcpListener, mio::net::TcpStream);
impl_tcp_listener!(std::net::TcpListener, std::net::TcpStream);
