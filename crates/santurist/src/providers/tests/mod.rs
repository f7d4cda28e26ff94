mod common;
mod invitations;
mod routing;
